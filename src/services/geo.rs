use crate::index::{ProximityIndex, QueryParams};
use crate::model::Location;
use crate::proto::geo::{geo_server::Geo, NearbyRequest, NearbyResponse};
use std::sync::Arc;
use tonic::{Request, Response, Status};
use tracing::debug;

/// Answers nearby queries from the proximity index.
#[derive(Debug, Clone)]
pub struct GeoService {
    index: Arc<ProximityIndex>,
    params: QueryParams,
}

impl GeoService {
    pub fn new(index: Arc<ProximityIndex>, params: QueryParams) -> Self {
        Self { index, params }
    }

    pub fn nearby_ids(&self, center: Location) -> Vec<String> {
        self.index
            .k_nearest(center, &self.params, |_| true)
            .into_iter()
            .map(|neighbor| neighbor.point.id.clone())
            .collect()
    }
}

#[tonic::async_trait]
impl Geo for GeoService {
    async fn nearby(
        &self,
        request: Request<NearbyRequest>,
    ) -> Result<Response<NearbyResponse>, Status> {
        let NearbyRequest { lat, lon } = request.into_inner();
        if !(lat.is_finite() && lon.is_finite() && (-90.0..=90.0).contains(&lat)) {
            return Err(Status::invalid_argument(format!(
                "invalid location: lat {lat}, lon {lon}"
            )));
        }

        let center = Location::new(lat, lon);
        let hotel_ids = self.nearby_ids(center);
        debug!(%center, hits = hotel_ids.len(), "nearby");
        Ok(Response::new(NearbyResponse { hotel_ids }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GeoPoint;

    fn service(k: usize) -> GeoService {
        let index = ProximityIndex::build(vec![
            GeoPoint::new("near", 37.7880, -122.4075),
            GeoPoint::new("mid", 37.7900, -122.4100),
            GeoPoint::new("far", 37.8500, -122.4075),
            GeoPoint::new("oakland", 37.8044, -122.2712),
            GeoPoint::new("sacramento", 38.5816, -121.4944),
        ])
        .unwrap();
        GeoService::new(Arc::new(index), QueryParams::new(k, 10.0).unwrap())
    }

    #[tokio::test]
    async fn test_nearby_applies_policy() {
        let response = service(5)
            .nearby(Request::new(NearbyRequest {
                lat: 37.7879,
                lon: -122.4075,
            }))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(response.hotel_ids, vec!["near", "mid", "far"]);

        let response = service(2)
            .nearby(Request::new(NearbyRequest {
                lat: 37.7879,
                lon: -122.4075,
            }))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(response.hotel_ids, vec!["near", "mid"]);
    }

    #[tokio::test]
    async fn test_nearby_nowhere_is_empty() {
        let response = service(5)
            .nearby(Request::new(NearbyRequest { lat: 0.0, lon: 0.0 }))
            .await
            .unwrap()
            .into_inner();
        assert!(response.hotel_ids.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_location_rejected() {
        let status = service(5)
            .nearby(Request::new(NearbyRequest {
                lat: f64::NAN,
                lon: 0.0,
            }))
            .await
            .unwrap_err();
        assert_eq!(status.code(), tonic::Code::InvalidArgument);
    }
}
