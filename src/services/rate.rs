use crate::data::RateTable;
use crate::model::Stay;
use crate::proto::rate::{rate_server::Rate, GetRatesRequest, GetRatesResponse, RatePlan};
use std::sync::Arc;
use tonic::{Request, Response, Status};
use tracing::debug;

/// Serves rate plans for a stay window from the loaded rate table.
#[derive(Debug, Clone)]
pub struct RateService {
    rates: Arc<RateTable>,
}

impl RateService {
    pub fn new(rates: Arc<RateTable>) -> Self {
        Self { rates }
    }
}

#[tonic::async_trait]
impl Rate for RateService {
    async fn get_rates(
        &self,
        request: Request<GetRatesRequest>,
    ) -> Result<Response<GetRatesResponse>, Status> {
        let GetRatesRequest {
            hotel_ids,
            in_date,
            out_date,
        } = request.into_inner();

        let mut rate_plans: Vec<RatePlan> = Vec::new();
        for hotel_id in hotel_ids {
            let stay = Stay {
                hotel_id,
                in_date: in_date.clone(),
                out_date: out_date.clone(),
            };
            if let Some(plans) = self.rates.get(&stay) {
                rate_plans.extend(plans.iter().cloned().map(Into::into));
            }
        }

        debug!(%in_date, %out_date, plans = rate_plans.len(), "get rates");
        Ok(Response::new(GetRatesResponse { rate_plans }))
    }
}
