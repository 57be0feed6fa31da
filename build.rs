use tonic_build::manual::{Builder, Method, Service};

fn unary(name: &str, route: &str, input: &str, output: &str) -> Method {
    Method::builder()
        .name(name)
        .route_name(route)
        .input_type(input)
        .output_type(output)
        .codec_path("tonic::codec::ProstCodec")
        .build()
}

fn main() {
    let geo = Service::builder()
        .name("Geo")
        .package("stayfinder.geo")
        .method(unary(
            "nearby",
            "Nearby",
            "crate::proto::geo::NearbyRequest",
            "crate::proto::geo::NearbyResponse",
        ))
        .build();

    let rate = Service::builder()
        .name("Rate")
        .package("stayfinder.rate")
        .method(unary(
            "get_rates",
            "GetRates",
            "crate::proto::rate::GetRatesRequest",
            "crate::proto::rate::GetRatesResponse",
        ))
        .build();

    let profile = Service::builder()
        .name("Profile")
        .package("stayfinder.profile")
        .method(unary(
            "get_profiles",
            "GetProfiles",
            "crate::proto::profile::GetProfilesRequest",
            "crate::proto::profile::GetProfilesResponse",
        ))
        .build();

    let search = Service::builder()
        .name("Search")
        .package("stayfinder.search")
        .method(unary(
            "nearby",
            "Nearby",
            "crate::proto::search::NearbyRequest",
            "crate::proto::search::SearchResponse",
        ))
        .build();

    Builder::new().compile(&[geo, rate, profile, search]);
    println!("cargo:rerun-if-changed=build.rs");
}
