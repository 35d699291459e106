use actix_csp_toggle::{
    csp_middleware, extract_nonce, parse_policy, CspConfig, CspConfigBuilder, CspError,
    CspExtensions, Environment, ModeHandle, PolicyMode, RandomSource, NonceGenerator,
    RequestNonce,
};
use actix_web::{http::StatusCode, test, web, App, HttpRequest, HttpResponse};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

async fn echo_nonce(req: HttpRequest) -> HttpResponse {
    HttpResponse::Ok().body(req.get_nonce().unwrap_or_default())
}

async fn echo_mode(req: HttpRequest) -> HttpResponse {
    HttpResponse::Ok().body(req.policy_mode().map(|mode| mode.to_string()).unwrap_or_default())
}

async fn page_with_own_csp() -> HttpResponse {
    HttpResponse::Ok()
        .insert_header(("content-security-policy", "default-src *"))
        .insert_header(("x-frame-options", "SAMEORIGIN"))
        .body("page")
}

struct BrokenRandom;

impl RandomSource for BrokenRandom {
    fn fill(&self, _buffer: &mut [u8]) -> Result<(), CspError> {
        Err(CspError::CryptoError("entropy source offline".to_string()))
    }
}

fn config(mode: PolicyMode, environment: Environment) -> CspConfig {
    CspConfigBuilder::new()
        .mode(mode)
        .environment(environment)
        .build()
}

/// A request the way a browser sends it, with a `Host` header.
fn get(uri: &str) -> test::TestRequest {
    test::TestRequest::get()
        .uri(uri)
        .insert_header(("host", "localhost:8080"))
}

fn csp_header<B>(resp: &actix_web::dev::ServiceResponse<B>) -> Option<String> {
    resp.headers()
        .get("content-security-policy")
        .map(|value| value.to_str().unwrap().to_string())
}

#[cfg(test)]
mod integration_tests {
    use super::*;

    macro_rules! csp_app {
        ($config:expr) => {
            test::init_service(
                App::new().service(
                    web::scope("")
                        .wrap(csp_middleware($config))
                        .route("/", web::get().to(echo_nonce))
                        .route("/mode", web::get().to(echo_mode))
                        .route("/own-csp", web::get().to(page_with_own_csp)),
                ),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn test_secure_production_script_src_has_nonce_only() {
        let app = csp_app!(config(PolicyMode::Secure, Environment::Production));
        let resp = test::call_service(&app, get("/").to_request()).await;

        assert_eq!(resp.status(), StatusCode::OK);
        let header = csp_header(&resp).expect("CSP header missing");
        let script_src = parse_policy(&header)["script-src"].clone();

        assert!(script_src.contains("'nonce-"));
        assert!(!script_src.contains("'unsafe-inline'"));
        assert!(!script_src.contains("'unsafe-eval'"));
    }

    #[actix_web::test]
    async fn test_insecure_mode_has_no_nonce_anywhere() {
        let app = csp_app!(config(PolicyMode::Insecure, Environment::Production));
        let resp = test::call_service(&app, get("/").to_request()).await;

        let header = csp_header(&resp).expect("CSP header missing");
        let script_src = parse_policy(&header)["script-src"].clone();

        assert!(script_src.contains("'unsafe-inline'"));
        assert!(script_src.contains("'unsafe-eval'"));
        assert!(!header.contains("'nonce-"));
        assert_eq!(parse_policy(&header)["connect-src"], "'self' wss: ws:");
    }

    #[actix_web::test]
    async fn test_nonces_are_unique_across_requests() {
        let app = csp_app!(config(PolicyMode::Secure, Environment::Production));
        let mut nonces = HashSet::new();

        for _ in 0..10 {
            let resp =
                test::call_service(&app, get("/").to_request()).await;
            let header = csp_header(&resp).unwrap();
            nonces.insert(extract_nonce(&header).expect("nonce missing"));
        }

        assert_eq!(nonces.len(), 10);
    }

    #[actix_web::test]
    async fn test_header_nonce_matches_rendered_nonce() {
        let app = csp_app!(config(PolicyMode::Secure, Environment::Production));
        let resp = test::call_service(&app, get("/").to_request()).await;

        let header_nonce = extract_nonce(&csp_header(&resp).unwrap()).unwrap();
        let body = test::read_body(resp).await;

        assert_eq!(body, header_nonce.as_bytes());
    }

    #[actix_web::test]
    async fn test_nonce_is_available_in_insecure_mode_too() {
        let app = csp_app!(config(PolicyMode::Insecure, Environment::Production));
        let resp = test::call_service(&app, get("/").to_request()).await;
        let body = test::read_body(resp).await;

        assert!(!body.is_empty());
    }

    #[actix_web::test]
    async fn test_default_config_fails_closed() {
        let app = csp_app!(CspConfig::default());
        let resp = test::call_service(&app, get("/").to_request()).await;

        let header = csp_header(&resp).unwrap();
        let script_src = parse_policy(&header)["script-src"].clone();

        assert!(script_src.contains("'nonce-"));
        assert!(!script_src.contains("'unsafe-inline'"));
        assert!(!script_src.contains("'unsafe-eval'"));
    }

    #[actix_web::test]
    async fn test_development_adds_unsafe_inline_beside_nonce() {
        let app = csp_app!(config(PolicyMode::Secure, Environment::Development));
        let resp = test::call_service(&app, get("/").to_request()).await;

        let script_src = parse_policy(&csp_header(&resp).unwrap())["script-src"].clone();

        assert!(script_src.contains("'nonce-"));
        assert!(script_src.contains("'unsafe-inline'"));
        assert!(!script_src.contains("'unsafe-eval'"));
    }

    #[actix_web::test]
    async fn test_connect_src_is_scoped_to_request_host() {
        let app = csp_app!(config(PolicyMode::Secure, Environment::Production));
        let req = test::TestRequest::get()
            .uri("/")
            .insert_header(("host", "example.com:5001"))
            .to_request();
        let resp = test::call_service(&app, req).await;

        let header = csp_header(&resp).unwrap();
        assert_eq!(
            parse_policy(&header)["connect-src"],
            "'self' wss://example.com:5001 ws://example.com:5001"
        );
        assert!(!header.contains("wss: "));
        assert!(!header.contains(" ws:;"));
    }

    #[actix_web::test]
    async fn test_auxiliary_headers_in_both_modes() {
        for mode in [PolicyMode::Secure, PolicyMode::Insecure] {
            let app = csp_app!(config(mode, Environment::Production));
            let resp =
                test::call_service(&app, get("/").to_request()).await;
            let headers = resp.headers();

            assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
            assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
            assert_eq!(
                headers.get("referrer-policy").unwrap(),
                "strict-origin-when-cross-origin"
            );
            let permissions = headers.get("permissions-policy").unwrap().to_str().unwrap();
            assert!(permissions.contains("camera=()"));
            assert!(permissions.contains("microphone=()"));
            assert!(permissions.contains("geolocation=()"));
        }
    }

    #[actix_web::test]
    async fn test_handler_headers_are_replaced_not_duplicated() {
        let app = csp_app!(config(PolicyMode::Secure, Environment::Production));
        let resp =
            test::call_service(&app, get("/own-csp").to_request()).await;

        let csp: Vec<_> = resp.headers().get_all("content-security-policy").collect();
        assert_eq!(csp.len(), 1);
        assert!(csp[0].to_str().unwrap().starts_with("default-src 'self'"));

        let frame: Vec<_> = resp.headers().get_all("x-frame-options").collect();
        assert_eq!(frame, ["DENY"]);
    }

    #[actix_web::test]
    async fn test_unmatched_routes_still_get_headers() {
        let app = csp_app!(config(PolicyMode::Secure, Environment::Production));
        let resp =
            test::call_service(&app, get("/missing").to_request()).await;

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert!(csp_header(&resp).is_some());
    }

    #[actix_web::test]
    async fn test_random_source_failure_aborts_request() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);

        async fn counted() -> HttpResponse {
            CALLS.fetch_add(1, Ordering::SeqCst);
            HttpResponse::Ok().body("should not render")
        }

        let config = CspConfigBuilder::new()
            .nonce_generator(NonceGenerator::new().with_source(BrokenRandom))
            .build();
        let stats = config.stats().clone();

        let app = test::init_service(
            App::new().service(
                web::scope("")
                    .wrap(csp_middleware(config))
                    .route("/", web::get().to(counted)),
            ),
        )
        .await;
        let resp = test::call_service(&app, get("/").to_request()).await;

        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(csp_header(&resp).is_none());
        assert_eq!(resp.headers().get("x-frame-options").unwrap(), "DENY");
        assert_eq!(CALLS.load(Ordering::SeqCst), 0);
        assert_eq!(stats.nonce_failure_count(), 1);

        let body = test::read_body(resp).await;
        assert_eq!(body, "Internal Server Error");
    }

    #[actix_web::test]
    async fn test_injected_host_is_rejected() {
        let config = config(PolicyMode::Secure, Environment::Production);
        let stats = config.stats().clone();
        let app = csp_app!(config);

        for host in ["evil.com; script-src *", "evil.com 'unsafe-eval'"] {
            let req = test::TestRequest::get()
                .uri("/")
                .insert_header(("host", host))
                .to_request();
            let resp = test::call_service(&app, req).await;

            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
            assert!(csp_header(&resp).is_none());
            assert_eq!(resp.headers().get("x-content-type-options").unwrap(), "nosniff");
        }

        assert_eq!(stats.rejected_host_count(), 2);
    }

    #[actix_web::test]
    async fn test_forwarded_headers_do_not_choose_the_connect_host() {
        let app = csp_app!(config(PolicyMode::Secure, Environment::Production));

        for (name, value) in [
            ("x-forwarded-host", "attacker.test"),
            ("forwarded", "host=attacker.test"),
        ] {
            let req = test::TestRequest::get()
                .uri("/")
                .insert_header(("host", "example.com:5001"))
                .insert_header((name, value))
                .to_request();
            let resp = test::call_service(&app, req).await;

            assert_eq!(resp.status(), StatusCode::OK);
            let header = csp_header(&resp).unwrap();
            assert_eq!(
                parse_policy(&header)["connect-src"],
                "'self' wss://example.com:5001 ws://example.com:5001"
            );
            assert!(!header.contains("attacker.test"));
        }
    }

    #[actix_web::test]
    async fn test_missing_host_is_rejected_in_secure_mode() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);

        async fn counted() -> HttpResponse {
            CALLS.fetch_add(1, Ordering::SeqCst);
            HttpResponse::Ok().finish()
        }

        let config = config(PolicyMode::Secure, Environment::Production);
        let stats = config.stats().clone();
        let app = test::init_service(
            App::new().service(
                web::scope("")
                    .wrap(csp_middleware(config))
                    .route("/", web::get().to(counted)),
            ),
        )
        .await;

        let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(csp_header(&resp).is_none());
        assert_eq!(CALLS.load(Ordering::SeqCst), 0);
        assert_eq!(stats.rejected_host_count(), 1);
    }

    #[actix_web::test]
    async fn test_missing_host_is_fine_in_insecure_mode() {
        let app = csp_app!(config(PolicyMode::Insecure, Environment::Production));
        let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(parse_policy(&csp_header(&resp).unwrap())["connect-src"], "'self' wss: ws:");
    }

    #[actix_web::test]
    async fn test_uri_authority_stands_in_for_missing_host() {
        let app = csp_app!(config(PolicyMode::Secure, Environment::Production));
        let req = test::TestRequest::get()
            .uri("https://example.org:8443/")
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            parse_policy(&csp_header(&resp).unwrap())["connect-src"],
            "'self' wss://example.org:8443 ws://example.org:8443"
        );
    }

    #[actix_web::test]
    async fn test_handlers_see_the_mode_the_header_was_built_with() {
        for mode in [PolicyMode::Secure, PolicyMode::Insecure] {
            let app = csp_app!(config(mode, Environment::Production));
            let resp = test::call_service(&app, get("/mode").to_request()).await;

            let nonce_in_header = csp_header(&resp).unwrap().contains("'nonce-");
            let body = test::read_body(resp).await;

            assert_eq!(body, mode.as_str());
            assert_eq!(nonce_in_header, mode.is_secure());
        }
    }

    #[actix_web::test]
    async fn test_mode_handle_is_read_per_request() {
        let mode = ModeHandle::new(PolicyMode::Insecure);
        let app = csp_app!(CspConfigBuilder::new().mode_source(mode.clone()).build());

        let resp = test::call_service(&app, get("/").to_request()).await;
        assert!(!csp_header(&resp).unwrap().contains("'nonce-"));

        mode.set(PolicyMode::Secure);

        let resp = test::call_service(&app, get("/").to_request()).await;
        assert!(csp_header(&resp).unwrap().contains("'nonce-"));
    }

    #[actix_web::test]
    async fn test_request_nonce_extractor() {
        async fn render(nonce: RequestNonce) -> HttpResponse {
            HttpResponse::Ok().body(format!("<script nonce=\"{}\"></script>", nonce))
        }

        let app = test::init_service(
            App::new()
                .service(
                    web::scope("/wrapped")
                        .wrap(csp_middleware(CspConfig::default()))
                        .route("", web::get().to(render)),
                )
                .route("/bare", web::get().to(render)),
        )
        .await;

        let resp =
            test::call_service(&app, get("/wrapped").to_request()).await;
        let nonce = extract_nonce(&csp_header(&resp).unwrap()).unwrap();
        let body = test::read_body(resp).await;
        assert_eq!(body, format!("<script nonce=\"{}\"></script>", nonce));

        let resp =
            test::call_service(&app, get("/bare").to_request()).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[actix_web::test]
    async fn test_stats_count_requests_by_mode() {
        let config = config(PolicyMode::Insecure, Environment::Production);
        let stats: Arc<_> = config.stats().clone();
        let app = csp_app!(config);

        for _ in 0..3 {
            test::call_service(&app, get("/").to_request()).await;
        }

        assert_eq!(stats.request_count(), 3);
        assert_eq!(stats.mode_count(PolicyMode::Insecure), 3);
        assert_eq!(stats.mode_count(PolicyMode::Secure), 0);
        assert_eq!(stats.nonce_generation_count(), 3);
    }
}
