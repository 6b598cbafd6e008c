use std::net::SocketAddr;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::state::AppState;
use crate::{pages, users};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .merge(pages::router())
        .merge(users::router())
        .fallback(pages::not_found)
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     _span: &tracing::Span| {
                        let status = res.status();
                        if status.is_server_error() {
                            tracing::error!(%status, ?latency, "response");
                        } else {
                            tracing::info!(%status, ?latency, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router, config: &AppConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!("server started on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        response::Response,
    };
    use tower::ServiceExt;

    async fn body_text(res: Response) -> String {
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_form(uri: &str, form: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(form.to_string()))
            .unwrap()
    }

    /// `name=value` pair of the remember cookie set by `res`.
    fn remember_pair(res: &Response) -> String {
        let set = res
            .headers()
            .get(header::SET_COOKIE)
            .expect("set-cookie header")
            .to_str()
            .unwrap();
        set.split(';').next().unwrap().to_string()
    }

    const ALICE: &str = "name=Alice&email=alice%40example.com&password=correct-horse";

    #[tokio::test]
    async fn static_pages_render() {
        let app = build_app(AppState::fake());
        for (uri, needle) in [
            ("/", "Welcome"),
            ("/contact", "Contact"),
            ("/gallery", "Gallery"),
            ("/auth/login", "Log in"),
            ("/auth/register", "Sign up"),
        ] {
            let res = app.clone().oneshot(get(uri)).await.unwrap();
            assert_eq!(res.status(), StatusCode::OK, "{uri}");
            assert!(body_text(res).await.contains(needle), "{uri}");
        }
    }

    #[tokio::test]
    async fn unknown_path_renders_404_page() {
        let app = build_app(AppState::fake());
        let res = app.oneshot(get("/no/such/page")).await.unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert!(body_text(res).await.contains("Page not found"));
    }

    #[tokio::test]
    async fn register_sets_cookie_and_cookietest_resolves_it() {
        let app = build_app(AppState::fake());

        let res = app
            .clone()
            .oneshot(post_form("/auth/register", ALICE))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(res.headers()[header::LOCATION], "/cookietest");
        let cookie = remember_pair(&res);
        assert!(cookie.starts_with("remember_token="));

        let req = Request::builder()
            .uri("/cookietest")
            .header(header::COOKIE, &cookie)
            .body(Body::empty())
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let text = body_text(res).await;
        assert!(text.contains("name: Alice"));
        assert!(text.contains("email: alice@example.com"));
    }

    #[tokio::test]
    async fn register_rejects_duplicate_and_invalid_input() {
        let app = build_app(AppState::fake());
        app.clone()
            .oneshot(post_form("/auth/register", ALICE))
            .await
            .unwrap();

        let res = app
            .clone()
            .oneshot(post_form("/auth/register", ALICE))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CONFLICT);
        assert!(body_text(res).await.contains("Email already registered"));

        let res = app
            .oneshot(post_form(
                "/auth/register",
                "name=Bob&email=bob%40example.com&password=short",
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert!(res.headers().get(header::SET_COOKIE).is_none());
    }

    #[tokio::test]
    async fn overlong_email_rerenders_form() {
        let app = build_app(AppState::fake());
        let form = format!(
            "name=Bob&email={}%40example.com&password=correct-horse",
            "b".repeat(95)
        );
        let res = app.oneshot(post_form("/auth/register", &form)).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert!(body_text(res).await.contains("at most 100 characters"));
    }

    #[tokio::test]
    async fn login_reports_unknown_email_and_bad_password() {
        let app = build_app(AppState::fake());
        app.clone()
            .oneshot(post_form("/auth/register", ALICE))
            .await
            .unwrap();

        let res = app
            .clone()
            .oneshot(post_form(
                "/auth/login",
                "email=nobody%40example.com&password=correct-horse",
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert!(body_text(res).await.contains("Invalid email address"));

        let res = app
            .oneshot(post_form(
                "/auth/login",
                "email=alice%40example.com&password=wrong-horse",
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert!(body_text(res).await.contains("Invalid password provided."));
    }

    #[tokio::test]
    async fn login_rotates_token_and_logout_forgets_it() {
        let app = build_app(AppState::fake());
        let res = app
            .clone()
            .oneshot(post_form("/auth/register", ALICE))
            .await
            .unwrap();
        let first = remember_pair(&res);

        let res = app
            .clone()
            .oneshot(post_form(
                "/auth/login",
                "email=Alice%40Example.com&password=correct-horse",
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        let second = remember_pair(&res);
        assert_ne!(first, second);

        let with_cookie = |uri: &str, method: &str, cookie: &str| {
            Request::builder()
                .method(method)
                .uri(uri)
                .header(header::COOKIE, cookie)
                .body(Body::empty())
                .unwrap()
        };

        let res = app
            .clone()
            .oneshot(with_cookie("/cookietest", "GET", &first))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let res = app
            .clone()
            .oneshot(with_cookie("/auth/logout", "POST", &second))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        let cleared = res.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(cleared.contains("Max-Age=0"));

        let res = app
            .oneshot(with_cookie("/cookietest", "GET", &second))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn cookietest_without_cookie_is_unauthorized() {
        let app = build_app(AppState::fake());
        let res = app.oneshot(get("/cookietest")).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }
}
