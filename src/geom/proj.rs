use std::{fmt, sync::Arc};

use geo::{Coord, Geometry, MapCoords, Polygon};
use proj4rs::{proj::Proj as Proj4, transform::transform};

use crate::error::{Error, Result};

/// EPSG code of the Israeli Transverse Mercator grid, the default working CRS.
pub const ISRAEL_TM_GRID: u32 = 2039;

/// EPSG code of WGS84 lon/lat, used for GeoJSON export.
pub const WGS84: u32 = 4326;

/// A coordinate reference system: an EPSG code and its PROJ.4 definition.
///
/// Two CRSs are equal when both the EPSG code and the PROJ.4 definition
/// match, ignoring whitespace between parameters. Layers whose CRSs differ
/// in either are always reprojected.
#[derive(Debug, Clone)]
pub struct Crs {
    epsg: u32,
    proj4: Arc<str>,
}

impl PartialEq for Crs {
    fn eq(&self, other: &Self) -> bool {
        self.epsg == other.epsg && self.proj4.split_whitespace().eq(other.proj4.split_whitespace())
    }
}

impl Eq for Crs {}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.epsg {
            0 => write!(f, "custom({})", self.proj4),
            epsg => write!(f, "EPSG:{epsg}"),
        }
    }
}

impl Crs {
    /// Look up one of the built-in definitions.
    pub fn from_epsg(epsg: u32) -> Result<Self> {
        let proj4: String = match epsg {
            4326 => "+proj=longlat +datum=WGS84 +no_defs +type=crs".into(),
            4269 => "+proj=longlat +datum=NAD83 +no_defs +type=crs".into(),
            3857 => "+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 +k=1 +units=m +no_defs +type=crs".into(),
            2039 => concat!(
                "+proj=tmerc +lat_0=31.7343936111111 +lon_0=35.2045169444444 +k=1.0000067 ",
                "+x_0=219529.584 +y_0=626907.39 +ellps=GRS80 ",
                "+towgs84=-24.0024,-17.1032,-17.8444,-0.33077,-1.85269,1.66969,5.4248 +units=m +no_defs +type=crs",
            ).into(),
            // WGS84 UTM north / south
            32601..=32660 => format!("+proj=utm +zone={} +datum=WGS84 +units=m +no_defs +type=crs", epsg - 32600),
            32701..=32760 => format!("+proj=utm +zone={} +south +datum=WGS84 +units=m +no_defs +type=crs", epsg - 32700),
            _ => return Err(Error::UnknownCrs(epsg)),
        };

        Ok(Self { epsg, proj4: proj4.into() })
    }

    /// A CRS with a caller-supplied PROJ.4 definition.
    pub fn custom(epsg: u32, proj4: impl Into<Arc<str>>) -> Self {
        Self { epsg, proj4: proj4.into() }
    }

    /// WGS84 lon/lat.
    pub fn wgs84() -> Self {
        Self::custom(WGS84, "+proj=longlat +datum=WGS84 +no_defs +type=crs")
    }

    #[inline] pub fn epsg(&self) -> u32 { self.epsg }

    #[inline] pub fn proj4(&self) -> &str { &self.proj4 }

    /// Geographic CRSs take and return degrees; proj4rs works in radians for them.
    #[inline]
    pub fn is_geographic(&self) -> bool {
        self.proj4.contains("+proj=longlat") || self.proj4.contains("+proj=latlong")
    }

    fn build(&self) -> std::result::Result<Proj4, String> {
        Proj4::from_proj_string(&self.proj4).map_err(|e| format!("invalid PROJ.4 `{}`: {e:?}", self.proj4))
    }
}

/// A prepared transformation between two CRSs.
pub struct Reprojector {
    from: Crs,
    to: Crs,
    src: Proj4,
    dst: Proj4,
}

impl Reprojector {
    pub fn new(from: &Crs, to: &Crs) -> Result<Self> {
        let fail = |reason: String| Error::Projection { from: from.epsg(), to: to.epsg(), reason };
        Ok(Self {
            src: from.build().map_err(fail)?,
            dst: to.build().map_err(fail)?,
            from: from.clone(),
            to: to.clone(),
        })
    }

    /// Transform a single coordinate.
    pub fn coord(&self, coord: Coord<f64>) -> Result<Coord<f64>> {
        let mut point = if self.from.is_geographic() {
            (coord.x.to_radians(), coord.y.to_radians(), 0.0)
        } else {
            (coord.x, coord.y, 0.0)
        };

        transform(&self.src, &self.dst, &mut point).map_err(|e| Error::Projection {
            from: self.from.epsg(),
            to: self.to.epsg(),
            reason: format!("{e:?}"),
        })?;

        Ok(if self.to.is_geographic() {
            Coord { x: point.0.to_degrees(), y: point.1.to_degrees() }
        } else {
            Coord { x: point.0, y: point.1 }
        })
    }

    /// Transform every vertex of a polygon.
    pub fn polygon(&self, polygon: &Polygon<f64>) -> Result<Polygon<f64>> {
        polygon.try_map_coords(|coord| self.coord(coord))
    }

    /// Transform every vertex of an arbitrary geometry.
    pub fn geometry(&self, geometry: &Geometry<f64>) -> Result<Geometry<f64>> {
        geometry.try_map_coords(|coord| self.coord(coord))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_lookup() {
        assert_eq!(Crs::from_epsg(2039).unwrap().epsg(), 2039);
        assert!(Crs::from_epsg(4326).unwrap().is_geographic());
        assert!(!Crs::from_epsg(32636).unwrap().is_geographic());
        assert!(Crs::from_epsg(32736).unwrap().proj4().contains("+south"));
        assert!(matches!(Crs::from_epsg(1), Err(Error::UnknownCrs(1))));
    }

    #[test]
    fn equality_needs_code_and_definition() {
        assert_eq!(Crs::wgs84(), Crs::from_epsg(4326).unwrap());
        assert_ne!(Crs::wgs84(), Crs::from_epsg(2039).unwrap());

        let itm = Crs::from_epsg(ISRAEL_TM_GRID).unwrap();
        let utm = Crs::from_epsg(32636).unwrap();
        assert_ne!(Crs::custom(0, itm.proj4()), Crs::custom(0, utm.proj4()));
        assert_eq!(Crs::custom(0, itm.proj4()), Crs::custom(0, itm.proj4().replace(' ', "  ")));
        assert_eq!(Crs::custom(0, utm.proj4()).to_string(), format!("custom({})", utm.proj4()));
    }

    #[test]
    fn israel_grid_round_trip() {
        let itm = Crs::from_epsg(ISRAEL_TM_GRID).unwrap();
        let forward = Reprojector::new(&itm, &Crs::wgs84()).unwrap();
        let backward = Reprojector::new(&Crs::wgs84(), &itm).unwrap();

        // A point near Jerusalem.
        let origin = Coord { x: 220_000.0, y: 630_000.0 };
        let lonlat = forward.coord(origin).unwrap();
        assert!((lonlat.x - 35.2).abs() < 0.1, "lon = {}", lonlat.x);
        assert!((lonlat.y - 31.76).abs() < 0.1, "lat = {}", lonlat.y);

        let back = backward.coord(lonlat).unwrap();
        assert!((back.x - origin.x).abs() < 0.01);
        assert!((back.y - origin.y).abs() < 0.01);
    }
}
