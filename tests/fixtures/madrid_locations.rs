//! Madrid locations for realistic test fixtures.
//!
//! Approximate coordinates of hospitals (used as vehicle bases) and
//! residential neighbourhoods (used as patient homes).

/// A named location with coordinates.
#[derive(Debug, Clone, Copy)]
pub struct Location {
    pub name: &'static str,
    pub lat: f64,
    pub lng: f64,
}

impl Location {
    pub const fn new(name: &'static str, lat: f64, lng: f64) -> Self {
        Self { name, lat, lng }
    }
}

// ============================================================================
// Hospitals (vehicle bases)
// ============================================================================

pub const HOSPITALS: &[Location] = &[
    Location::new("Hospital Universitario La Paz", 40.4813, -3.6868),
    Location::new("Hospital Gregorio Marañón", 40.4189, -3.6716),
    Location::new("Hospital 12 de Octubre", 40.3754, -3.6986),
    Location::new("Hospital Clínico San Carlos", 40.4406, -3.7186),
];

// ============================================================================
// Residential areas (patient homes)
// ============================================================================

pub const HOMES: &[Location] = &[
    Location::new("Chamberí", 40.4340, -3.7038),
    Location::new("Salamanca", 40.4300, -3.6770),
    Location::new("Lavapiés", 40.4087, -3.7007),
    Location::new("Tetuán", 40.4603, -3.6982),
    Location::new("Usera", 40.3834, -3.7065),
    Location::new("Carabanchel", 40.3800, -3.7350),
    Location::new("Moncloa", 40.4350, -3.7190),
    Location::new("Puente de Vallecas", 40.3918, -3.6585),
    Location::new("Hortaleza", 40.4722, -3.6408),
    Location::new("Ciudad Lineal", 40.4480, -3.6500),
    Location::new("Retiro", 40.4110, -3.6760),
    Location::new("Arganzuela", 40.3980, -3.6950),
    Location::new("Latina", 40.4030, -3.7360),
    Location::new("Fuencarral", 40.4780, -3.7100),
    Location::new("Chamartín", 40.4580, -3.6770),
    Location::new("Moratalaz", 40.4070, -3.6450),
    Location::new("Villaverde", 40.3450, -3.7000),
    Location::new("San Blas", 40.4300, -3.6150),
    Location::new("Barajas", 40.4730, -3.5800),
    Location::new("Aravaca", 40.4600, -3.7850),
];
