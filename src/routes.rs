use crate::{
    api::{attendance, staff, task},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};

/// Per-route limiter. A zero rate is clamped to the tightest limiter the
/// builder accepts: burst_size(0) makes finish() return None.
fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    let per_ms = if requests_per_min == 0 {
        1
    } else {
        60_000 / requests_per_min as u64
    };
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min.max(1))
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .unwrap();
    Governor::new(&cfg)
}

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(build_limiter(config.rate_login_per_min))
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/register")
                    .wrap(build_limiter(config.rate_register_per_min))
                    .route(web::post().to(handlers::register)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(build_limiter(config.rate_refresh_per_min))
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(build_limiter(config.rate_login_per_min))
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware))
            .wrap(build_limiter(config.rate_protected_per_min)) // rate limiting
            .service(handlers::protected)
            .service(
                web::scope("/attendance")
                    // /attendance/qr
                    .service(
                        web::resource("/qr").route(web::post().to(attendance::generate_qr)),
                    )
                    // /attendance/check-in
                    .service(
                        web::resource("/check-in").route(web::post().to(attendance::check_in)),
                    )
                    // /attendance/check-out
                    .service(
                        web::resource("/check-out").route(web::put().to(attendance::check_out)),
                    )
                    // /attendance
                    .service(
                        web::resource("").route(web::get().to(attendance::list_attendance)),
                    )
                    // /attendance/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::patch().to(attendance::update_attendance)),
                    ),
            )
            .service(
                web::scope("/staff")
                    // /staff
                    .service(
                        web::resource("")
                            .route(web::post().to(staff::create_staff))
                            .route(web::get().to(staff::list_staff)),
                    )
                    // /staff/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::put().to(staff::update_staff))
                            .route(web::get().to(staff::get_staff))
                            .route(web::delete().to(staff::delete_staff)),
                    ),
            )
            .service(
                web::scope("/tasks")
                    // /tasks
                    .service(
                        web::resource("")
                            .route(web::post().to(task::create_task))
                            .route(web::get().to(task::list_tasks)),
                    )
                    // /tasks/{id}
                    .service(web::resource("/{id}").route(web::get().to(task::get_task)))
                    // /tasks/{id}/status
                    .service(
                        web::resource("/{id}/status")
                            .route(web::put().to(task::update_task_status)),
                    ),
            ),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limiter_builds_for_zero_and_normal_rates() {
        // A misconfigured zero rate must not panic at startup.
        let _ = build_limiter(0);
        let _ = build_limiter(60);
        let _ = build_limiter(1000);
    }
}
