const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Coordinates {
    pub(crate) latitude: f64,
    pub(crate) longitude: f64,
}

impl Coordinates {
    pub(crate) fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum LocationCheck {
    Verified { distance: f64 },
    OutOfRange { distance: f64 },
    Unverified,
}

impl LocationCheck {
    pub(crate) fn distance(&self) -> Option<f64> {
        match self {
            Self::Verified { distance } | Self::OutOfRange { distance } => Some(*distance),
            Self::Unverified => None,
        }
    }
}

/// Great-circle distance in meters.
pub(crate) fn haversine_meters(a: Coordinates, b: Coordinates) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_METERS * h.sqrt().atan2((1.0 - h).sqrt())
}

pub(crate) fn check_location(
    school: Coordinates,
    radius_meters: f64,
    device: Option<Coordinates>,
) -> LocationCheck {
    let Some(device) = device else {
        return LocationCheck::Unverified;
    };

    let distance = haversine_meters(school, device);
    if distance <= radius_meters {
        LocationCheck::Verified { distance }
    } else {
        LocationCheck::OutOfRange { distance }
    }
}
