use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};

use sinav_server::{app_state::AppState, config::Config, handlers};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env();
    let host = config.web_server_host.clone();
    let port = config.web_server_port;

    let state = AppState::new(config)
        .await
        .expect("failed to initialize application state");

    log::info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&state.config.cors_allowed_origin)
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(Logger::default())
            .wrap(cors)
            .service(handlers::health_check)
            .service(handlers::create_template)
            .service(handlers::list_templates)
            .service(handlers::get_template)
            .service(handlers::update_answer_key)
            .service(handlers::delete_template)
            .service(handlers::create_bulk_results)
            .service(handlers::list_results)
            .service(handlers::get_exam_report)
            .service(handlers::delete_result)
            .service(handlers::assign_to_students)
            .service(handlers::list_student_assignments)
            .service(handlers::submit_answers)
            .service(handlers::get_summary)
            .service(handlers::get_subject_performance)
            .service(handlers::get_performance_trends)
            .service(handlers::get_student_analytics)
            .service(handlers::get_weighted_questions)
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}
