use crate::completion;
use crate::db::models::Role;
use crate::error::ApiError;
use crate::session::{self, display_name, role_of};
use crate::startup::AppState;
use axum::{
    extract::Extension,
    response::{Html, IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

pub async fn landing() -> Html<&'static str> {
    Html(include_str!("../static/landing.html"))
}

pub async fn auth_page() -> Html<&'static str> {
    Html(include_str!("../static/auth.html"))
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn page(title: &str, body: &str) -> Html<String> {
    Html(format!(
        "<!doctype html>\n<html lang=\"pt-BR\">\n<head><meta charset=\"utf-8\"><title>{title}</title></head>\n<body>\n{body}\n</body>\n</html>\n"
    ))
}

pub async fn dashboard(
    Extension(app_state): Extension<AppState>,
    session: Session,
) -> Result<Response, ApiError> {
    let Some(user_id) = session::current_user(&session).await? else {
        return Ok(Redirect::to("/auth").into_response());
    };
    let store = app_state.store.as_ref();

    let name = display_name(store, user_id)
        .await
        .unwrap_or_else(|| "Cidadão".to_string());
    let progress = match completion::check(store, user_id).await {
        Ok(c) => format!(
            "<p>Você votou em {} de {} casos ({}%).</p>",
            c.user_votes_count, c.total_elections, c.progress
        ),
        Err(e) => {
            error!("completion check for {} failed: {}", user_id, e);
            "<p>Não foi possível carregar seu progresso.</p>".to_string()
        }
    };

    let body = format!(
        "<h1>Olá, {}</h1>\n{progress}\n<div id=\"elections\"></div>",
        escape(&name)
    );
    Ok(page("Painel - Votação Cidadã", &body).into_response())
}

/// Admin screen. Anonymous callers go to `/auth`, everyone without the admin
/// role goes to `/`; nothing admin-only is rendered for them.
pub async fn admin_dashboard(
    Extension(app_state): Extension<AppState>,
    session: Session,
) -> Result<Response, ApiError> {
    let Some(user_id) = session::current_user(&session).await? else {
        return Ok(Redirect::to("/auth").into_response());
    };
    let store = app_state.store.as_ref();
    if role_of(store, user_id).await != Role::Admin {
        info!("redirecting non-admin {} away from /admin", user_id);
        return Ok(Redirect::to("/").into_response());
    }

    let elections = store.count_elections().await.unwrap_or_else(|e| {
        error!("failed to count elections: {}", e);
        0
    });
    let body = format!(
        "<h1>Administração</h1>\n<p>{elections} casos cadastrados.</p>\n\
         <nav><a href=\"/api/admin/elections\">Votações</a> \
         <a href=\"/api/admin/options\">Opções</a> \
         <a href=\"/api/admin/users\">Usuários</a> \
         <a href=\"/api/admin/payments\">Pagamentos</a></nav>"
    );
    Ok(page("Administração - Votação Cidadã", &body).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_escaped() {
        assert_eq!(escape("<b>Ana & \"Bia\"</b>"), "&lt;b&gt;Ana &amp; &quot;Bia&quot;&lt;/b&gt;");
    }
}
