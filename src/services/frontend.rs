//! HTTP edge of the fleet: `GET /hotels` answered as a GeoJSON feature
//! collection.

use crate::connection::Connection;
use crate::dispatch::Role;
use crate::interceptor::ServerTraceLayer;
use crate::model::Location;
use crate::proto::profile::{profile_client::ProfileClient, GetProfilesRequest, Hotel};
use crate::proto::search::{search_client::SearchClient, NearbyRequest};
use crate::trace::{outbound, CallContext, Tracer};
use axum::extract::{Extension, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tonic::Status;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, warn};

pub const MISSING_DATES_MESSAGE: &str = "Please specify inDate/outDate params";

#[derive(Debug, Clone)]
pub struct FrontendService {
    search: SearchClient<Connection>,
    profile: ProfileClient<Connection>,
    origin: Location,
    default_locale: String,
}

impl FrontendService {
    pub fn new(
        search: Connection,
        profile: Connection,
        origin: Location,
        default_locale: impl Into<String>,
    ) -> Self {
        Self {
            search: SearchClient::new(search),
            profile: ProfileClient::new(profile),
            origin,
            default_locale: default_locale.into(),
        }
    }

    /// Routes of the edge service, traced and CORS-enabled.
    pub fn router(self, tracer: Tracer) -> Router {
        Router::new()
            .route("/hotels", get(hotels))
            .with_state(Arc::new(self))
            .layer(ServerTraceLayer::new(tracer))
            .layer(CorsLayer::new().allow_origin(Any))
    }

    async fn find_hotels(
        &self,
        call: Option<&CallContext>,
        in_date: String,
        out_date: String,
        locale: String,
    ) -> Result<Vec<Hotel>, FrontendError> {
        let found = self
            .search
            .clone()
            .nearby(outbound(
                call,
                NearbyRequest {
                    lat: self.origin.lat,
                    lon: self.origin.lon,
                    in_date,
                    out_date,
                },
            ))
            .await
            .map_err(|status| FrontendError::Dependent {
                role: Role::Search,
                status,
            })?
            .into_inner();

        let profiles = self
            .profile
            .clone()
            .get_profiles(outbound(
                call,
                GetProfilesRequest {
                    hotel_ids: found.hotel_ids,
                    locale,
                },
            ))
            .await
            .map_err(|status| FrontendError::Dependent {
                role: Role::Profile,
                status,
            })?
            .into_inner();

        Ok(profiles.hotels)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct HotelsQuery {
    #[serde(rename = "inDate")]
    pub in_date: Option<String>,
    #[serde(rename = "outDate")]
    pub out_date: Option<String>,
    pub locale: Option<String>,
}

async fn hotels(
    State(frontend): State<Arc<FrontendService>>,
    call: Option<Extension<CallContext>>,
    Query(query): Query<HotelsQuery>,
) -> Result<Json<FeatureCollection>, FrontendError> {
    let in_date = query.in_date.filter(|date| !date.is_empty());
    let out_date = query.out_date.filter(|date| !date.is_empty());
    let (Some(in_date), Some(out_date)) = (in_date, out_date) else {
        return Err(FrontendError::MissingDates);
    };
    let locale = query
        .locale
        .filter(|locale| !locale.is_empty())
        .unwrap_or_else(|| frontend.default_locale.clone());

    let call = call.map(|Extension(call)| call);
    let hotels = frontend
        .find_hotels(call.as_ref(), in_date, out_date, locale)
        .await?;
    debug!(hotels = hotels.len(), "hotels");
    Ok(Json(FeatureCollection::from_hotels(hotels)))
}

#[derive(Debug, Error)]
pub enum FrontendError {
    #[error("{}", MISSING_DATES_MESSAGE)]
    MissingDates,
    #[error("{role} call failed: {}", status.message())]
    Dependent { role: Role, status: Status },
}

impl IntoResponse for FrontendError {
    fn into_response(self) -> Response {
        match self {
            FrontendError::MissingDates => {
                (StatusCode::BAD_REQUEST, MISSING_DATES_MESSAGE).into_response()
            }
            FrontendError::Dependent { role, status } => {
                warn!(dependent = %role, code = ?status.code(), error = status.message(), "dependent call failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    status.message().to_string(),
                )
                    .into_response()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub kind: String,
    pub features: Vec<Feature>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    pub properties: FeatureProperties,
    pub geometry: Geometry,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureProperties {
    pub name: String,
    pub phone_number: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    #[serde(rename = "type")]
    pub kind: String,
    /// `[lon, lat]`
    pub coordinates: [f64; 2],
}

impl FeatureCollection {
    /// One point feature per hotel, in the given order. Hotels without an
    /// address have no position and are left out.
    pub fn from_hotels(hotels: Vec<Hotel>) -> Self {
        let features = hotels
            .into_iter()
            .filter_map(|hotel| {
                let Some(address) = hotel.address else {
                    warn!(hotel = %hotel.id, "hotel has no address, skipping");
                    return None;
                };
                Some(Feature {
                    kind: "Feature".to_string(),
                    id: hotel.id,
                    properties: FeatureProperties {
                        name: hotel.name,
                        phone_number: hotel.phone_number,
                    },
                    geometry: Geometry {
                        kind: "Point".to_string(),
                        coordinates: [address.lon, address.lat],
                    },
                })
            })
            .collect();

        Self {
            kind: "FeatureCollection".to_string(),
            features,
        }
    }
}
