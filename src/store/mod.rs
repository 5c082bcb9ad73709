//! In-memory catalog of regional offices and artists.
//!
//! Stands in for the relational database: regionais are seeded from
//! configuration and read-only, artists are created at runtime.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::schema::CatalogConfig;

/// A regional office.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Regional {
    pub id: u32,
    pub nome: String,
    pub ativo: bool,
}

/// An artist record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artist {
    pub id: u64,
    pub name: String,
    pub genre: String,
    pub regional_id: Option<u32>,
}

/// Input for a new artist.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewArtist {
    pub name: String,
    pub genre: String,
    #[serde(default)]
    pub regional_id: Option<u32>,
}

/// Rejected catalog writes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("{0} must not be blank")]
    Blank(&'static str),

    #[error("regional {0} does not exist")]
    UnknownRegional(u32),
}

#[derive(Debug)]
pub struct Catalog {
    regionais: Vec<Regional>,
    artists: DashMap<u64, Artist>,
    next_id: AtomicU64,
}

impl Catalog {
    pub fn new(regionais: Vec<Regional>) -> Self {
        Self {
            regionais,
            artists: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn from_config(config: &CatalogConfig) -> Self {
        Self::new(
            config
                .regionais
                .iter()
                .map(|r| Regional {
                    id: r.id,
                    nome: r.nome.clone(),
                    ativo: r.ativo,
                })
                .collect(),
        )
    }

    pub fn regionais(&self) -> &[Regional] {
        &self.regionais
    }

    /// All artists ordered by id.
    pub fn artists(&self) -> Vec<Artist> {
        let mut artists: Vec<Artist> = self.artists.iter().map(|a| a.value().clone()).collect();
        artists.sort_by_key(|a| a.id);
        artists
    }

    pub fn artist(&self, id: u64) -> Option<Artist> {
        self.artists.get(&id).map(|a| a.value().clone())
    }

    pub fn create_artist(&self, input: NewArtist) -> Result<Artist, CatalogError> {
        let name = input.name.trim();
        let genre = input.genre.trim();
        if name.is_empty() {
            return Err(CatalogError::Blank("name"));
        }
        if genre.is_empty() {
            return Err(CatalogError::Blank("genre"));
        }
        if let Some(regional_id) = input.regional_id {
            if !self.regionais.iter().any(|r| r.id == regional_id) {
                return Err(CatalogError::UnknownRegional(regional_id));
            }
        }

        let artist = Artist {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            name: name.to_string(),
            genre: genre.to_string(),
            regional_id: input.regional_id,
        };
        self.artists.insert(artist.id, artist.clone());
        Ok(artist)
    }
}
