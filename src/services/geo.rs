//! Geographic estimates

use crate::types::Coordinates;

/// Earth radius in kilometers
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Road distance coefficient (straight line to road)
pub const ROAD_COEFFICIENT: f64 = 1.3;

/// Average speed in km/h for travel time estimation
pub const AVERAGE_SPEED_KMH: f64 = 40.0;

/// Calculate Haversine distance between two points in kilometers
pub fn haversine_distance(from: &Coordinates, to: &Coordinates) -> f64 {
    let d_lat = (to.lat - from.lat).to_radians();
    let d_lon = (to.lng - from.lng).to_radians();

    let lat1 = from.lat.to_radians();
    let lat2 = to.lat.to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);

    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_KM * c
}

/// Estimate travel time in minutes
pub fn travel_time_minutes(
    from: &Coordinates,
    to: &Coordinates,
    road_coefficient: f64,
    average_speed_kmh: f64,
) -> f64 {
    let road_km = haversine_distance(from, to) * road_coefficient;
    road_km / average_speed_kmh * 60.0
}

/// Time matrix between all points (in minutes), zero diagonal
pub fn time_matrix_with(
    points: &[Coordinates],
    road_coefficient: f64,
    average_speed_kmh: f64,
) -> Vec<Vec<f64>> {
    let n = points.len();
    let mut matrix = vec![vec![0.0; n]; n];

    for i in 0..n {
        for j in 0..n {
            if i != j {
                matrix[i][j] =
                    travel_time_minutes(&points[i], &points[j], road_coefficient, average_speed_kmh);
            }
        }
    }

    matrix
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_prague_brno() {
        let prague = Coordinates::new(50.0755, 14.4378);
        let brno = Coordinates::new(49.1951, 16.6068);

        let distance = haversine_distance(&prague, &brno);

        // Prague to Brno is approximately 185 km
        assert!((distance - 185.0).abs() < 5.0);
    }

    #[test]
    fn test_haversine_same_point() {
        let point = Coordinates::new(50.0, 14.0);
        let distance = haversine_distance(&point, &point);
        assert!((distance - 0.0).abs() < 0.001);
    }

    #[test]
    fn test_travel_time() {
        let from = Coordinates::new(50.0, 14.0);
        let to = Coordinates::new(50.0, 14.5);

        let time = travel_time_minutes(&from, &to, ROAD_COEFFICIENT, AVERAGE_SPEED_KMH);

        assert!(time > 0.0);
        assert!(time < 120.0);
    }

    #[test]
    fn test_time_matrix() {
        let points = vec![
            Coordinates::new(50.0, 14.0),
            Coordinates::new(50.1, 14.1),
            Coordinates::new(50.2, 14.2),
        ];

        let matrix = time_matrix_with(&points, ROAD_COEFFICIENT, AVERAGE_SPEED_KMH);

        assert_eq!(matrix.len(), 3);
        assert_eq!(matrix[0].len(), 3);
        for i in 0..3 {
            assert_eq!(matrix[i][i], 0.0);
        }
        assert!((matrix[0][1] - matrix[1][0]).abs() < 1e-9);
        assert!(matrix[0][2] > matrix[0][1]);
    }
}
