//! # Role Dispatch
//!
//! Turns a role token into a running server. Startup moves through three
//! states, each consuming the last:
//!
//! * [`Unresolved`]: a parsed role and its configuration.
//! * [`Wired`]: every dependent the role binds to is dialed.
//! * [`Service`]: the role's facade is built from its data files and
//!   connections; [`Service::serve`] runs it until shutdown.
//!
//! Any fault aborts startup before the role listens.

use crate::config::{DependentsConfig, StayConfig};
use crate::connection::{dial, Connection, DialError, DialSettings};
use crate::data::{self, DataError};
use crate::index::{QueryError, QueryParams};
use crate::interceptor::ServerTraceLayer;
use crate::model::Location;
use crate::proto::geo::geo_server::GeoServer;
use crate::proto::profile::profile_server::ProfileServer;
use crate::proto::rate::rate_server::RateServer;
use crate::proto::search::search_server::SearchServer;
use crate::services::{FrontendService, GeoService, ProfileService, RateService, SearchService};
use crate::trace::{TraceError, Tracer};
use hashbrown::HashMap;
use std::fmt;
use std::future::Future;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::service::Routes;
use tonic::transport::Server;
use tracing::info;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("unknown role {0:?}; expected one of geo, rate, profile, search, frontend")]
    UnknownRole(String),
    #[error(transparent)]
    Dial(#[from] DialError),
    #[error(transparent)]
    Data(#[from] DataError),
    #[error("invalid query policy: {0}")]
    Query(#[from] QueryError),
    #[error(transparent)]
    Tracing(#[from] TraceError),
    #[error("no connection to required dependent {0}")]
    MissingConnection(Role),
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("{role} server failed: {source}")]
    Serve {
        role: Role,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Geo,
    Rate,
    Profile,
    Search,
    Frontend,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Geo,
        Role::Rate,
        Role::Profile,
        Role::Search,
        Role::Frontend,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Geo => "geo",
            Role::Rate => "rate",
            Role::Profile => "profile",
            Role::Search => "search",
            Role::Frontend => "frontend",
        }
    }

    /// Dependents this role dials at startup.
    pub fn binding(&self) -> RoleBinding {
        let dependents: &'static [Role] = match self {
            Role::Search => &[Role::Geo, Role::Rate],
            Role::Frontend => &[Role::Search, Role::Profile],
            Role::Geo | Role::Rate | Role::Profile => &[],
        };
        RoleBinding {
            role: *self,
            dependents,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = StartupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| StartupError::UnknownRole(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleBinding {
    pub role: Role,
    pub dependents: &'static [Role],
}

fn dependent_address(dependents: &DependentsConfig, role: Role) -> &str {
    match role {
        Role::Geo => &dependents.geo,
        Role::Rate => &dependents.rate,
        Role::Profile => &dependents.profile,
        Role::Search => &dependents.search,
        Role::Frontend => "",
    }
}

/// A role that has not touched the network yet.
#[derive(Debug)]
pub struct Unresolved {
    role: Role,
    config: StayConfig,
    tracer: Option<Tracer>,
}

impl Unresolved {
    pub fn new(role: Role, config: StayConfig) -> Self {
        Self {
            role,
            config,
            tracer: None,
        }
    }

    /// Use `tracer` instead of one built from the tracing configuration.
    pub fn with_tracer(mut self, tracer: Tracer) -> Self {
        self.tracer = Some(tracer);
        self
    }

    /// Dial every dependent of the role. The first failure aborts.
    pub async fn wire(self) -> Result<Wired, StartupError> {
        let Unresolved {
            role,
            config,
            tracer,
        } = self;
        let tracer = match tracer {
            Some(tracer) => tracer,
            None => Tracer::from_config(role.as_str(), &config.tracing).await?,
        };

        let settings = DialSettings {
            connect_timeout: Duration::from_millis(config.dial.connect_timeout_ms),
        };
        let mut connections = HashMap::new();
        for &dependent in role.binding().dependents {
            let address = dependent_address(&config.dependents, dependent);
            let connection = dial(dependent, address, &tracer, &settings).await?;
            connections.insert(dependent, connection);
        }

        Ok(Wired {
            role,
            config,
            tracer,
            connections,
        })
    }
}

/// A role with a live connection to each of its dependents.
#[derive(Debug)]
pub struct Wired {
    role: Role,
    config: StayConfig,
    tracer: Tracer,
    connections: HashMap<Role, Connection>,
}

impl Wired {
    pub fn role(&self) -> Role {
        self.role
    }

    pub fn connection(&self, role: Role) -> Option<&Connection> {
        self.connections.get(&role)
    }

    fn take(&mut self, role: Role) -> Result<Connection, StartupError> {
        self.connections
            .remove(&role)
            .ok_or(StartupError::MissingConnection(role))
    }

    /// Build the role's facade, loading whatever data it serves.
    pub fn into_service(mut self) -> Result<Service, StartupError> {
        let data = &self.config.data;
        let facade = match self.role {
            Role::Geo => {
                let query = &self.config.query;
                let params = QueryParams::new(query.max_results, query.max_radius_km)?;
                let index = data::load_geo_index(&data.geo)?;
                Facade::Geo(GeoService::new(Arc::new(index), params))
            }
            Role::Rate => Facade::Rate(RateService::new(Arc::new(data::load_rates(&data.rates)?))),
            Role::Profile => Facade::Profile(ProfileService::new(Arc::new(
                data::load_profiles(&data.hotels)?,
            ))),
            Role::Search => {
                let geo = self.take(Role::Geo)?;
                let rate = self.take(Role::Rate)?;
                Facade::Search(SearchService::new(geo, rate))
            }
            Role::Frontend => {
                let search = self.take(Role::Search)?;
                let profile = self.take(Role::Profile)?;
                let frontend = &self.config.frontend;
                Facade::Frontend(FrontendService::new(
                    search,
                    profile,
                    Location::new(frontend.origin_lat, frontend.origin_lon),
                    frontend.default_locale.clone(),
                ))
            }
        };

        Ok(Service {
            role: self.role,
            tracer: self.tracer,
            facade,
        })
    }
}

/// The facade behind one role.
#[derive(Debug)]
pub enum Facade {
    Geo(GeoService),
    Rate(RateService),
    Profile(ProfileService),
    Search(SearchService),
    Frontend(FrontendService),
}

/// A fully built role, ready to serve.
#[derive(Debug)]
pub struct Service {
    role: Role,
    tracer: Tracer,
    facade: Facade,
}

impl Service {
    pub fn role(&self) -> Role {
        self.role
    }

    pub fn facade(&self) -> &Facade {
        &self.facade
    }

    /// Serve on `listener` until `shutdown` resolves.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<(), StartupError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let role = self.role;
        if let Ok(addr) = listener.local_addr() {
            info!(%role, %addr, "serving");
        }
        let serve_error = |source: Box<dyn std::error::Error + Send + Sync>| {
            StartupError::Serve { role, source }
        };

        let routes = match self.facade {
            Facade::Geo(service) => Routes::new(GeoServer::new(service)),
            Facade::Rate(service) => Routes::new(RateServer::new(service)),
            Facade::Profile(service) => Routes::new(ProfileServer::new(service)),
            Facade::Search(service) => Routes::new(SearchServer::new(service)),
            Facade::Frontend(service) => {
                return axum::serve(listener, service.router(self.tracer))
                    .with_graceful_shutdown(shutdown)
                    .await
                    .map_err(|err| serve_error(Box::new(err)));
            }
        };

        Server::builder()
            .layer(ServerTraceLayer::new(self.tracer))
            .add_routes(routes)
            .serve_with_incoming_shutdown(TcpListenerStream::new(listener), shutdown)
            .await
            .map_err(|err| serve_error(Box::new(err)))
    }
}

/// Start `role`: wire, build, bind the configured address, and serve until
/// `shutdown` resolves.
pub async fn run<F>(role: Role, config: StayConfig, shutdown: F) -> Result<(), StartupError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = config.listen_addr();
    let service = Unresolved::new(role, config).wire().await?.into_service()?;
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| StartupError::Bind { addr, source })?;
    service.serve(listener, shutdown).await
}
