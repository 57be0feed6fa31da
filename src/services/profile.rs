use crate::data::ProfileTable;
use crate::proto::profile::{
    profile_server::Profile, GetProfilesRequest, GetProfilesResponse, Hotel,
};
use std::sync::Arc;
use tonic::{Request, Response, Status};
use tracing::debug;

/// Looks up stored hotel profiles by id. Unknown ids are skipped.
#[derive(Debug, Clone)]
pub struct ProfileService {
    profiles: Arc<ProfileTable>,
}

impl ProfileService {
    pub fn new(profiles: Arc<ProfileTable>) -> Self {
        Self { profiles }
    }
}

#[tonic::async_trait]
impl Profile for ProfileService {
    async fn get_profiles(
        &self,
        request: Request<GetProfilesRequest>,
    ) -> Result<Response<GetProfilesResponse>, Status> {
        let GetProfilesRequest { hotel_ids, locale } = request.into_inner();
        let hotels: Vec<Hotel> = hotel_ids
            .iter()
            .filter_map(|id| self.profiles.get(id))
            .cloned()
            .map(Into::into)
            .collect();

        debug!(%locale, requested = hotel_ids.len(), found = hotels.len(), "get profiles");
        Ok(Response::new(GetProfilesResponse { hotels }))
    }
}
