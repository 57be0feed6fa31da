//! # Data Model
//!
//! Records loaded from the bundled data files. Each role reads its own file once
//! at startup; the wire representations live in [`crate::proto`].

use crate::proto;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A hotel location on the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    #[serde(rename = "hotelId")]
    pub id: String,
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(id: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            id: id.into(),
            lat,
            lon,
        }
    }

    pub fn location(&self) -> Location {
        Location::new(self.lat, self.lon)
    }
}

/// A bare coordinate pair, used as a query centre.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
}

impl Location {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lon)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub street_number: String,
    pub street_name: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub postal_code: String,
    pub lat: f64,
    pub lon: f64,
}

/// Stored hotel profile served by the profile role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotelProfile {
    pub id: String,
    pub name: String,
    pub phone_number: String,
    #[serde(default)]
    pub description: String,
    pub address: Address,
}

impl From<HotelProfile> for proto::profile::Hotel {
    fn from(hotel: HotelProfile) -> Self {
        let address = hotel.address;
        proto::profile::Hotel {
            id: hotel.id,
            name: hotel.name,
            phone_number: hotel.phone_number,
            description: hotel.description,
            address: Some(proto::profile::Address {
                street_number: address.street_number,
                street_name: address.street_name,
                city: address.city,
                state: address.state,
                country: address.country,
                postal_code: address.postal_code,
                lat: address.lat,
                lon: address.lon,
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomType {
    pub bookable_rate: f64,
    pub total_rate: f64,
    pub total_rate_inclusive: f64,
    pub code: String,
    #[serde(default)]
    pub description: String,
}

/// A bookable rate for one hotel over one stay window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatePlan {
    pub hotel_id: String,
    pub code: String,
    pub in_date: String,
    pub out_date: String,
    pub room_type: RoomType,
}

impl RatePlan {
    pub fn stay(&self) -> Stay {
        Stay {
            hotel_id: self.hotel_id.clone(),
            in_date: self.in_date.clone(),
            out_date: self.out_date.clone(),
        }
    }
}

impl From<RatePlan> for proto::rate::RatePlan {
    fn from(plan: RatePlan) -> Self {
        let room = plan.room_type;
        proto::rate::RatePlan {
            hotel_id: plan.hotel_id,
            code: plan.code,
            in_date: plan.in_date,
            out_date: plan.out_date,
            room_type: Some(proto::rate::RoomType {
                bookable_rate: room.bookable_rate,
                total_rate: room.total_rate,
                total_rate_inclusive: room.total_rate_inclusive,
                code: room.code,
                description: room.description,
            }),
        }
    }
}

/// Lookup key for rate plans.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Stay {
    pub hotel_id: String,
    pub in_date: String,
    pub out_date: String,
}
