use crate::connection::Connection;
use crate::dispatch::Role;
use crate::proto::geo::{self, geo_client::GeoClient};
use crate::proto::rate::{rate_client::RateClient, GetRatesRequest};
use crate::proto::search::{search_server::Search, NearbyRequest, SearchResponse};
use crate::trace::{outbound, CallContext};
use hashbrown::HashSet;
use tonic::{Request, Response, Status};
use tracing::debug;

/// Combines geo proximity with rate availability.
#[derive(Debug, Clone)]
pub struct SearchService {
    geo: GeoClient<Connection>,
    rate: RateClient<Connection>,
}

impl SearchService {
    pub fn new(geo: Connection, rate: Connection) -> Self {
        Self {
            geo: GeoClient::new(geo),
            rate: RateClient::new(rate),
        }
    }
}

/// Status returned to the caller when a dependent call fails.
pub(crate) fn dependent_failure(role: Role, status: &Status) -> Status {
    Status::unavailable(format!("{role}: {}", status.message()))
}

#[tonic::async_trait]
impl Search for SearchService {
    async fn nearby(
        &self,
        request: Request<NearbyRequest>,
    ) -> Result<Response<SearchResponse>, Status> {
        let call = CallContext::of(&request);
        let NearbyRequest {
            lat,
            lon,
            in_date,
            out_date,
        } = request.into_inner();
        if in_date.is_empty() || out_date.is_empty() {
            return Err(Status::invalid_argument("in_date and out_date are required"));
        }

        let nearby = self
            .geo
            .clone()
            .nearby(outbound(call.as_ref(), geo::NearbyRequest { lat, lon }))
            .await
            .map_err(|status| dependent_failure(Role::Geo, &status))?
            .into_inner();

        let rates = self
            .rate
            .clone()
            .get_rates(outbound(
                call.as_ref(),
                GetRatesRequest {
                    hotel_ids: nearby.hotel_ids.clone(),
                    in_date,
                    out_date,
                },
            ))
            .await
            .map_err(|status| dependent_failure(Role::Rate, &status))?
            .into_inner();

        let available: HashSet<&str> = rates
            .rate_plans
            .iter()
            .map(|plan| plan.hotel_id.as_str())
            .collect();
        let mut seen = HashSet::new();
        let hotel_ids: Vec<String> = nearby
            .hotel_ids
            .into_iter()
            .filter(|id| available.contains(id.as_str()) && seen.insert(id.clone()))
            .collect();

        debug!(lat, lon, hits = hotel_ids.len(), "search nearby");
        Ok(Response::new(SearchResponse { hotel_ids }))
    }
}
