use crate::configuration::Settings;
use crate::persistence::Persistence;
use crate::registration::RegistrationService;
use crate::routes;
use crate::waitlist_repository::MongoWaitlistRepository;
use actix_cors::Cors;
use actix_web::{dev::Server, web, App, HttpServer};
use std::net::TcpListener;
use std::sync::Arc;
use tracing_actix_web::TracingLogger;

pub struct Application {
    port: u16,
    server: Server,
    persistence: Persistence,
}

impl Application {
    /// Connects to the store, makes sure the unique index exists and binds the listener.
    /// Nothing is served if any of this fails.
    pub async fn build(configuration: Settings) -> Result<Self, anyhow::Error> {
        let persistence = Persistence::initialize(&configuration.database).await?;
        Self::build_with_persistence(configuration, persistence).await
    }

    /// Takes ownership of the handle: it is shut down if the server can't be started.
    pub async fn build_with_persistence(
        configuration: Settings,
        persistence: Persistence,
    ) -> Result<Self, anyhow::Error> {
        match Self::serve(&configuration, &persistence) {
            Ok((port, server)) => Ok(Self {
                port,
                server,
                persistence,
            }),
            Err(e) => {
                persistence.shutdown().await;
                Err(e)
            }
        }
    }

    fn serve(
        configuration: &Settings,
        persistence: &Persistence,
    ) -> Result<(u16, Server), anyhow::Error> {
        let address = format!(
            "{}:{}",
            configuration.application.host, configuration.application.port
        );
        let listener = TcpListener::bind(&address)?;
        // Retrieve the port assigned to us by the OS when asked for port 0.
        let port = listener.local_addr()?.port();

        let repository = MongoWaitlistRepository::new(persistence.clone());
        let registration = RegistrationService::new(Arc::new(repository));
        let server = run(listener, registration)?;

        Ok((port, server))
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Only returns once the server is stopped. The persistence handle is released on the way
    /// out, whatever the server returned.
    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> {
        let outcome = self.server.await;
        if let Err(e) = &outcome {
            tracing::error!(error.cause_chain = ?e, "The server stopped with an error");
        }
        self.persistence.shutdown().await;
        outcome
    }
}

pub fn run(
    listener: TcpListener,
    registration: RegistrationService,
) -> Result<Server, std::io::Error> {
    // Wrap the service in a smart pointer, every worker gets a clone of the `Arc`.
    let registration = web::Data::new(registration);
    let server = HttpServer::new(move || {
        App::new()
            // The last `wrap` is the outermost middleware: CORS answers preflight requests
            // before they get to the logger.
            .wrap(TracingLogger::default())
            .wrap(Cors::permissive())
            .app_data(web::JsonConfig::default().error_handler(routes::json_error_handler))
            .route("/health_check", web::get().to(routes::health_check))
            .route("/waitlist/", web::post().to(routes::join_waitlist))
            .route("/waitlist", web::post().to(routes::join_waitlist))
            .app_data(registration.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}
