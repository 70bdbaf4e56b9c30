use crate::{
    api::{attendance, employee, health, request, users},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_web::{middleware::from_fn, web};

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config) {
    // Root routes; /process authenticates through the AuthUser extractor
    cfg.route("/health", web::get().to(health::health))
        .route("/process", web::post().to(attendance::process));

    // Public routes
    cfg.service(
        web::scope(&config.api_prefix)
            .route("/health", web::get().to(health::health))
            .route("/login", web::post().to(handlers::login))
            .route("/signup", web::post().to(handlers::signup))
            // Protected routes
            .service(
                web::scope("")
                    .wrap(from_fn(auth_middleware))
                    .service(
                        web::scope("/employees")
                            // /employees
                            .service(
                                web::resource("")
                                    .route(web::post().to(employee::create_employee))
                                    .route(web::get().to(employee::list_employees)),
                            )
                            // /employees/{id}
                            .service(
                                web::resource("/{id}")
                                    .route(web::put().to(employee::update_employee))
                                    .route(web::get().to(employee::get_employee))
                                    .route(web::delete().to(employee::delete_employee)),
                            )
                            // /employees/{id}/status
                            .service(
                                web::resource("/{id}/status")
                                    .route(web::put().to(employee::set_employee_status)),
                            ),
                    )
                    .service(
                        web::scope("/admin")
                            // /admin/users
                            .service(
                                web::resource("/users")
                                    .route(web::get().to(users::list_users))
                                    .route(web::post().to(users::create_user)),
                            )
                            // /admin/users/{username}
                            .service(
                                web::resource("/users/{username}")
                                    .route(web::put().to(users::update_user)),
                            )
                            // /admin/users/{username}/toggle-status
                            .service(
                                web::resource("/users/{username}/toggle-status")
                                    .route(web::put().to(users::toggle_user_status)),
                            )
                            // /admin/pending
                            .service(
                                web::resource("/pending").route(web::get().to(users::list_pending)),
                            )
                            .service(
                                web::resource("/pending/{username}/approve")
                                    .route(web::post().to(users::approve_pending)),
                            )
                            .service(
                                web::resource("/pending/{username}/reject")
                                    .route(web::post().to(users::reject_pending)),
                            ),
                    )
                    .service(
                        web::scope("/requests")
                            .service(
                                web::resource("")
                                    .route(web::post().to(request::create_request))
                                    .route(web::get().to(request::list_requests)),
                            )
                            .service(
                                web::resource("/latest").route(web::get().to(request::latest_requests)),
                            )
                            .service(
                                web::resource("/{id}/cancel")
                                    .route(web::put().to(request::cancel_request)),
                            ),
                    )
                    .service(
                        web::scope("/attendance").service(
                            web::resource("/analyze").route(web::post().to(attendance::analyze)),
                        ),
                    ),
            ),
    );
}
