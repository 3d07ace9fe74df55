use serde::{Deserialize, Serialize};

/// A receiver's fixed geographic configuration.
///
/// `fips6` is the receiver's own 6-character FIPS area code; the leading
/// digit (the part-of-county selector) is ignored for matching purposes,
/// matching the convention used throughout SAME/VTEC area codes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
    pub fips6: String,
}

impl Location {
    pub fn new(lat: f64, lon: f64, fips6: impl Into<String>) -> Self {
        Self { lat, lon, fips6: fips6.into() }
    }

    /// The county FIPS code ignoring the part-of-county selector digit.
    pub fn county_fips(&self) -> &str {
        strip_part_of_county(&self.fips6)
    }
}

/// Drop the leading part-of-county selector digit, if present.
pub fn strip_part_of_county(fips6: &str) -> &str {
    if fips6.len() == 6 {
        &fips6[1..]
    } else {
        fips6
    }
}

/// True if `fips6` (ignoring its part-of-county digit) matches any entry in
/// `area_list` (also ignoring each entry's part-of-county digit).
pub fn fips_list_matches(area_list: &[String], fips6: &str) -> bool {
    let target = strip_part_of_county(fips6);
    area_list.iter().any(|a| strip_part_of_county(a) == target)
}

/// A closed polygon given as an ordered ring of (lat, lon) vertices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub vertices: Vec<(f64, f64)>,
}

impl Polygon {
    pub fn new(vertices: Vec<(f64, f64)>) -> Self {
        Self { vertices }
    }

    /// Ray-casting point-in-polygon test. The ray is cast along the
    /// positive-longitude direction from `(lat, lon)`.
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        let n = self.vertices.len();
        if n < 3 {
            return false;
        }
        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let (yi, xi) = self.vertices[i];
            let (yj, xj) = self.vertices[j];
            let intersects = ((yi > lat) != (yj > lat))
                && (lon < (xj - xi) * (lat - yi) / (yj - yi) + xi);
            if intersects {
                inside = !inside;
            }
            j = i;
        }
        inside
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_part_of_county_digit() {
        assert_eq!(strip_part_of_county("037183"), "37183");
        assert_eq!(strip_part_of_county("137183"), "37183");
    }

    #[test]
    fn fips_matching_ignores_part_of_county() {
        let list = vec!["137183".to_string(), "029047".to_string()];
        assert!(fips_list_matches(&list, "037183"));
        assert!(!fips_list_matches(&list, "037184"));
    }

    #[test]
    fn square_polygon_contains_center_not_outside() {
        let square = Polygon::new(vec![
            (40.0, -103.0),
            (40.0, -102.0),
            (41.0, -102.0),
            (41.0, -103.0),
        ]);
        assert!(square.contains(40.5, -102.5));
        assert!(!square.contains(42.0, -102.5));
    }
}
