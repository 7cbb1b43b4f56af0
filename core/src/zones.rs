//! Zone endpoints.
//!
//! A thin wrapper over `Client`: each call builds a request, executes it, and
//! maps the server's known error messages onto `ZoneError` sentinels.

use thiserror::Error;

use crate::client::Client;
use crate::error::ApiError;
use crate::http::HttpMethod;
use crate::types::Zone;

#[derive(Debug, Error)]
pub enum ZoneError {
    #[error("zone already exists")]
    AlreadyExists,

    #[error("zone does not exist")]
    Missing,

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Server messages with a sentinel meaning.
const MSG_ZONE_EXISTS: &str = "zone already exists";
const MSG_ZONE_NOT_FOUND: &str = "zone not found";

impl Client {
    pub fn zones(&self) -> Zones<'_> {
        Zones { client: self }
    }
}

pub struct Zones<'a> {
    client: &'a Client,
}

impl Zones<'_> {
    /// Every zone on the account, across all pages when the client follows
    /// pagination.
    pub fn list(&self) -> Result<Vec<Zone>, ZoneError> {
        let req = self.client.build_request(HttpMethod::Get, "zones")?;
        let mut zones = Vec::new();
        self.client.execute_paged(&req, &mut zones)?;
        Ok(zones)
    }

    pub fn get(&self, zone: &str) -> Result<Zone, ZoneError> {
        let req = self.client.build_request(HttpMethod::Get, &zone_path(zone))?;
        let (zone, _) = self.client.execute_json(&req).map_err(map_missing)?;
        Ok(zone)
    }

    /// Create `zone`; the server echoes the stored zone.
    pub fn create(&self, zone: &Zone) -> Result<Zone, ZoneError> {
        let req = self
            .client
            .build_json_request(HttpMethod::Put, &zone_path(&zone.zone), zone)?;
        let (created, _) = self.client.execute_json(&req).map_err(|e| match e.message() {
            Some(MSG_ZONE_EXISTS) => ZoneError::AlreadyExists,
            _ => ZoneError::Api(e),
        })?;
        Ok(created)
    }

    pub fn update(&self, zone: &Zone) -> Result<Zone, ZoneError> {
        let req = self
            .client
            .build_json_request(HttpMethod::Post, &zone_path(&zone.zone), zone)?;
        let (updated, _) = self.client.execute_json(&req).map_err(map_missing)?;
        Ok(updated)
    }

    pub fn delete(&self, zone: &str) -> Result<(), ZoneError> {
        let req = self.client.build_request(HttpMethod::Delete, &zone_path(zone))?;
        self.client.execute(&req).map_err(map_missing)?;
        Ok(())
    }
}

fn zone_path(zone: &str) -> String {
    format!("zones/{}", zone.trim_matches('/'))
}

fn map_missing(e: ApiError) -> ZoneError {
    match (e.status(), e.message()) {
        (Some(404), Some(MSG_ZONE_NOT_FOUND)) => ZoneError::Missing,
        _ => ZoneError::Api(e),
    }
}
