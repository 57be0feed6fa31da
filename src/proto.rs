//! # Wire Types
//!
//! Protobuf messages for the internal RPC surface and the tonic service stubs
//! generated for them by `build.rs`.

pub mod geo {
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct NearbyRequest {
        #[prost(double, tag = "1")]
        pub lat: f64,
        #[prost(double, tag = "2")]
        pub lon: f64,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct NearbyResponse {
        #[prost(string, repeated, tag = "1")]
        pub hotel_ids: Vec<String>,
    }

    include!(concat!(env!("OUT_DIR"), "/stayfinder.geo.Geo.rs"));
}

pub mod rate {
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct GetRatesRequest {
        #[prost(string, repeated, tag = "1")]
        pub hotel_ids: Vec<String>,
        #[prost(string, tag = "2")]
        pub in_date: String,
        #[prost(string, tag = "3")]
        pub out_date: String,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct GetRatesResponse {
        #[prost(message, repeated, tag = "1")]
        pub rate_plans: Vec<RatePlan>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct RatePlan {
        #[prost(string, tag = "1")]
        pub hotel_id: String,
        #[prost(string, tag = "2")]
        pub code: String,
        #[prost(string, tag = "3")]
        pub in_date: String,
        #[prost(string, tag = "4")]
        pub out_date: String,
        #[prost(message, optional, tag = "5")]
        pub room_type: Option<RoomType>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct RoomType {
        #[prost(double, tag = "1")]
        pub bookable_rate: f64,
        #[prost(double, tag = "2")]
        pub total_rate: f64,
        #[prost(double, tag = "3")]
        pub total_rate_inclusive: f64,
        #[prost(string, tag = "4")]
        pub code: String,
        #[prost(string, tag = "5")]
        pub description: String,
    }

    include!(concat!(env!("OUT_DIR"), "/stayfinder.rate.Rate.rs"));
}

pub mod profile {
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct GetProfilesRequest {
        #[prost(string, repeated, tag = "1")]
        pub hotel_ids: Vec<String>,
        #[prost(string, tag = "2")]
        pub locale: String,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct GetProfilesResponse {
        #[prost(message, repeated, tag = "1")]
        pub hotels: Vec<Hotel>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Hotel {
        #[prost(string, tag = "1")]
        pub id: String,
        #[prost(string, tag = "2")]
        pub name: String,
        #[prost(string, tag = "3")]
        pub phone_number: String,
        #[prost(string, tag = "4")]
        pub description: String,
        #[prost(message, optional, tag = "5")]
        pub address: Option<Address>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Address {
        #[prost(string, tag = "1")]
        pub street_number: String,
        #[prost(string, tag = "2")]
        pub street_name: String,
        #[prost(string, tag = "3")]
        pub city: String,
        #[prost(string, tag = "4")]
        pub state: String,
        #[prost(string, tag = "5")]
        pub country: String,
        #[prost(string, tag = "6")]
        pub postal_code: String,
        #[prost(double, tag = "7")]
        pub lat: f64,
        #[prost(double, tag = "8")]
        pub lon: f64,
    }

    include!(concat!(env!("OUT_DIR"), "/stayfinder.profile.Profile.rs"));
}

pub mod search {
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct NearbyRequest {
        #[prost(double, tag = "1")]
        pub lat: f64,
        #[prost(double, tag = "2")]
        pub lon: f64,
        #[prost(string, tag = "3")]
        pub in_date: String,
        #[prost(string, tag = "4")]
        pub out_date: String,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct SearchResponse {
        #[prost(string, repeated, tag = "1")]
        pub hotel_ids: Vec<String>,
    }

    include!(concat!(env!("OUT_DIR"), "/stayfinder.search.Search.rs"));
}
