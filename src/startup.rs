use crate::config::Config;
use crate::notify::VoteNotifier;
use crate::payments::PaymentGateway;
use crate::store::Store;
use crate::{admin, auth, completion, elections, pages, payments, voting};
use axum::{
    Router,
    extract::Extension,
    http::{
        HeaderName, Method, StatusCode,
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    },
    response::IntoResponse,
    routing::{get, patch, post, put},
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_sessions::{
    Expiry, SessionManagerLayer, SessionStore,
    cookie::{SameSite, time::Duration},
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub notifier: VoteNotifier,
    pub payments: Arc<dyn PaymentGateway>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, payments: Arc<dyn PaymentGateway>, config: Config) -> Self {
        AppState {
            store,
            notifier: VoteNotifier::default(),
            payments,
            config: Arc::new(config),
        }
    }
}

pub fn build_router(app_state: AppState) -> Router {
    let app = Router::new()
        .route("/", get(pages::landing))
        .route("/auth", get(pages::auth_page))
        .route("/dashboard", get(pages::dashboard))
        .route("/admin", get(pages::admin_dashboard))
        .route("/api/auth/signup", post(auth::signup))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/session", get(auth::session_info))
        .route("/api/elections", get(elections::list_elections))
        .route("/api/elections/:id/selection", put(voting::select_option))
        .route("/api/elections/:id/vote", post(voting::vote))
        .route("/api/me/completion", get(completion::completion_snapshot))
        .route("/api/me/completion/events", get(completion::completion_events))
        .route("/api/payments/checkout", post(payments::checkout))
        .route("/api/payments/prompt/dismiss", post(payments::dismiss_prompt))
        .nest("/api/admin", admin_routes())
        .layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::mirror_request())
                .allow_credentials(true)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::PATCH,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([CONTENT_TYPE, ACCEPT]),
        );

    // The hosted-function equivalent answers any origin.
    let functions = Router::new()
        .route(
            "/functions/v1/create-payment",
            post(payments::create_payment_function),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::POST, Method::OPTIONS])
                .allow_headers([
                    AUTHORIZATION,
                    HeaderName::from_static("x-client-info"),
                    HeaderName::from_static("apikey"),
                    CONTENT_TYPE,
                ]),
        );

    app.merge(functions)
        .layer(Extension(app_state))
        .fallback(handler_404)
}

fn admin_routes() -> Router {
    Router::new()
        .route(
            "/elections",
            get(admin::elections::list).post(admin::elections::create),
        )
        .route(
            "/elections/:id",
            put(admin::elections::update).delete(admin::elections::delete),
        )
        .route("/elections/:id/results", get(admin::elections::results))
        .route(
            "/options",
            get(admin::options::list).post(admin::options::create),
        )
        .route(
            "/options/:id",
            put(admin::options::update).delete(admin::options::delete),
        )
        .route("/users", get(admin::users::list))
        .route("/users/:id/role", put(admin::users::set_role))
        .route("/payments", get(admin::payments::list))
        .route("/payments/:id", patch(admin::payments::update_status))
}

/// Wraps the router in cookie sessions backed by `store`.
pub fn with_sessions<S>(router: Router, store: S, config: &Config) -> Router
where
    S: SessionStore + Clone,
{
    router.layer(
        SessionManagerLayer::new(store)
            .with_name("votacao")
            .with_same_site(SameSite::Lax)
            .with_secure(config.session_secure)
            .with_expiry(Expiry::OnInactivity(Duration::seconds(
                config.session_inactivity_secs,
            ))),
    )
}

async fn handler_404() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "nothing to see here")
}
