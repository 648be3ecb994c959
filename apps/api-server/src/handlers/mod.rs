//! HTTP handlers and route configuration.

mod auth;
mod comments;
mod health;
mod posts;

use actix_web::web;

/// Configure all application routes.
///
/// Literal segments under /posts are registered before the `{id}` routes so
/// they are matched first.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            // Public routes
            .route("/health", web::get().to(health::health_check))
            // Auth routes
            .service(
                web::scope("/auth")
                    .route("/register", web::post().to(auth::register))
                    .route("/login", web::post().to(auth::login))
                    .route("/me", web::get().to(auth::me)),
            )
            // Post routes
            .service(
                web::scope("/posts")
                    .route("/public", web::get().to(posts::list_public))
                    .route("/me", web::get().to(posts::my_posts))
                    .route("/me/stats", web::get().to(posts::my_stats))
                    .route("/trigger-publish", web::post().to(posts::trigger_publish))
                    .route("", web::post().to(posts::create_post))
                    .route("/{id}", web::get().to(posts::get_post))
                    .route("/{id}", web::put().to(posts::update_post))
                    .route("/{id}", web::delete().to(posts::delete_post))
                    .route("/{id}/like", web::post().to(posts::toggle_like))
                    .route("/{id}/comments", web::get().to(comments::list_comments))
                    .route("/{id}/comments", web::post().to(comments::add_comment)),
            )
            // Comment routes
            .service(
                web::scope("/comments").route("/{id}", web::delete().to(comments::delete_comment)),
            ),
    );
}
