//! Caller-facing search entry points. `Searcher` owns the collaborators and
//! runs one query flow: resolve, query the archive, normalize, append TESS
//! cutouts. The façade types only differ in the parameters they accept.

use std::fmt;
use std::ops::Deref;

use crate::archive::{ArchiveClient, ArchiveQuery, MastArchiveClient};
use crate::cadence::Cadence;
use crate::catalog::{Observation, RawProduct};
use crate::config::ResolvedConfig;
use crate::domain::{Mission, SkyCoord, Target};
use crate::download::{DownloadOptions, Downloader, Manifest};
use crate::error::{LkError, SearchWarning};
use crate::http::MastHttp;
use crate::mission::MissionStrategy;
use crate::normalize::{self, QueryFilters};
use crate::pipeline::{self, TESSCUT};
use crate::resolver::{CoordinateResolver, MastNameResolver};
use crate::result::{SearchResult, TableFilter};
use crate::tesscut::{self, FootprintClient, TesscutHttpClient, TesscutState};
use crate::transfer::TransferClient;

#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub target: Target,
    pub mission: Option<Mission>,
    pub pipeline: Vec<String>,
    pub exptime: Cadence,
    pub quarter: Vec<u32>,
    pub campaign: Vec<u32>,
    pub sector: Vec<u32>,
    pub month: Vec<u8>,
    /// Arcseconds; unset restricts results to the target itself.
    pub search_radius: Option<f64>,
    /// Include high-level science products. Unset uses the configured default.
    pub hlsp: Option<bool>,
}

impl SearchRequest {
    pub fn new(target: impl Into<Target>) -> Self {
        Self {
            target: target.into(),
            mission: None,
            pipeline: Vec::new(),
            exptime: Cadence::Any,
            quarter: Vec::new(),
            campaign: Vec::new(),
            sector: Vec::new(),
            month: Vec::new(),
            search_radius: None,
            hlsp: None,
        }
    }

    /// Parses a catalog id, coordinate string or name.
    pub fn parse(target: &str) -> Result<Self, LkError> {
        Ok(Self::new(target.parse::<Target>()?))
    }

    pub fn mission(mut self, mission: Mission) -> Self {
        self.mission = Some(mission);
        self
    }

    pub fn pipeline(mut self, name: &str) -> Self {
        self.pipeline.push(name.to_string());
        self
    }

    pub fn exptime(mut self, exptime: impl Into<Cadence>) -> Self {
        self.exptime = exptime.into();
        self
    }

    pub fn quarter(mut self, quarter: u32) -> Self {
        self.quarter.push(quarter);
        self
    }

    pub fn campaign(mut self, campaign: u32) -> Self {
        self.campaign.push(campaign);
        self
    }

    pub fn sector(mut self, sector: u32) -> Self {
        self.sector.push(sector);
        self
    }

    pub fn month(mut self, month: u8) -> Self {
        self.month.push(month);
        self
    }

    pub fn search_radius(mut self, arcsec: f64) -> Self {
        self.search_radius = Some(arcsec);
        self
    }

    pub fn hlsp(mut self, hlsp: bool) -> Self {
        self.hlsp = Some(hlsp);
        self
    }

    fn reject(&self, facade: &str, params: &[(&str, bool)]) -> Result<(), LkError> {
        match params.iter().find(|(_, present)| *present) {
            Some((name, _)) => Err(LkError::Configuration(format!(
                "{facade} does not accept the `{name}` parameter"
            ))),
            None => Ok(()),
        }
    }

    fn check_mission(&self, expected: Mission) -> Result<(), LkError> {
        match self.mission {
            Some(mission) if mission != expected => Err(LkError::Configuration(format!(
                "a {expected} search cannot be restricted to mission {mission}"
            ))),
            _ => Ok(()),
        }
    }
}

impl From<Target> for SearchRequest {
    fn from(target: Target) -> Self {
        Self::new(target)
    }
}

/// Runs searches against one set of collaborators.
pub struct Searcher<R, A, F> {
    resolver: R,
    archive: A,
    footprint: F,
    config: ResolvedConfig,
}

impl Searcher<MastNameResolver, MastArchiveClient, TesscutHttpClient> {
    /// Searcher wired to the live MAST services.
    pub fn from_config(config: ResolvedConfig) -> Result<Self, LkError> {
        let http = MastHttp::new(&config)?;
        Ok(Self::new(
            MastNameResolver::new(http.clone()),
            MastArchiveClient::new(http.clone()),
            TesscutHttpClient::new(http, &config),
            config,
        ))
    }
}

impl<R, A, F> Searcher<R, A, F>
where
    R: CoordinateResolver,
    A: ArchiveClient,
    F: FootprintClient,
{
    pub fn new(resolver: R, archive: A, footprint: F, config: ResolvedConfig) -> Self {
        Self {
            resolver,
            archive,
            footprint,
            config,
        }
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    /// Multi-mission search. Mission-specific parameters must agree with an
    /// explicit `mission`.
    pub fn mast(&self, request: SearchRequest) -> Result<MastSearch, LkError> {
        if let Some(mission) = request.mission {
            let contradicts = [
                ("quarter", !request.quarter.is_empty(), Mission::Kepler),
                ("campaign", !request.campaign.is_empty(), Mission::K2),
                ("sector", !request.sector.is_empty(), Mission::Tess),
                ("month", !request.month.is_empty(), Mission::Kepler),
            ];
            if let Some((name, _, owner)) = contradicts
                .iter()
                .find(|(_, present, owner)| *present && *owner != mission)
            {
                return Err(LkError::Configuration(format!(
                    "`{name}` applies to {owner}, not {mission}"
                )));
            }
        }
        self.run(request).map(MastSearch)
    }

    pub fn kepler(&self, request: SearchRequest) -> Result<KeplerSearch, LkError> {
        request.check_mission(Mission::Kepler)?;
        request.reject(
            "KeplerSearch",
            &[
                ("campaign", !request.campaign.is_empty()),
                ("sector", !request.sector.is_empty()),
            ],
        )?;
        self.run(request.mission(Mission::Kepler)).map(KeplerSearch)
    }

    pub fn k2(&self, request: SearchRequest) -> Result<K2Search, LkError> {
        request.check_mission(Mission::K2)?;
        request.reject(
            "K2Search",
            &[
                ("quarter", !request.quarter.is_empty()),
                ("sector", !request.sector.is_empty()),
                ("month", !request.month.is_empty()),
            ],
        )?;
        self.run(request.mission(Mission::K2)).map(K2Search)
    }

    pub fn tess(&self, request: SearchRequest) -> Result<TessSearch, LkError> {
        request.check_mission(Mission::Tess)?;
        request.reject(
            "TessSearch",
            &[
                ("quarter", !request.quarter.is_empty()),
                ("campaign", !request.campaign.is_empty()),
                ("month", !request.month.is_empty()),
            ],
        )?;
        self.run(request.mission(Mission::Tess)).map(TessSearch)
    }

    fn run(&self, request: SearchRequest) -> Result<MissionSearch, LkError> {
        let hlsp = request.hlsp.unwrap_or(self.config.hlsp);
        let strategy = request.mission.map(MissionStrategy::for_mission);
        let pipelines = self.pipelines(&request, strategy, hlsp);

        let filters = QueryFilters {
            mission: request.mission,
            pipelines: pipelines.clone(),
            exptime: request.exptime,
            quarter: request.quarter.clone(),
            campaign: request.campaign.clone(),
            sector: request.sector.clone(),
            month: request.month.clone(),
            search_radius: request.search_radius,
            target_id: request.target.catalog_id(),
            position: None,
            nearest_tolerance_arcsec: self.config.nearest_tolerance_arcsec,
        };
        // Caller errors surface before any network traffic.
        filters.validate()?;

        let position = match request.target.known_position() {
            Some(position) => position,
            None => self.resolver.resolve(&request.target.to_string())?,
        };
        let filters = QueryFilters {
            position: Some(position),
            ..filters
        };

        let missions = request
            .mission
            .map(|mission| vec![mission])
            .unwrap_or_else(|| Mission::ALL.to_vec());
        let query = ArchiveQuery {
            position,
            radius_arcsec: request
                .search_radius
                .unwrap_or(self.config.query_radius_arcsec),
            missions,
            hlsp: hlsp || requests_hlsp(&pipelines),
        };
        tracing::info!(target_name = %request.target, %position, radius = query.radius_arcsec, "querying archive");
        let raw = self.archive.query(&query)?;
        let rows = normalize::normalize(raw, &filters)?;

        let mut warnings = Vec::new();
        let (tesscut, cutouts) = if request.mission == Some(Mission::Tess) {
            self.cutouts(&request, &filters, &rows, position, &mut warnings)?
        } else {
            (TesscutState::NotQueried, SearchResult::empty())
        };

        let result = if !cutouts.is_empty()
            && (pipelines.is_empty() || pipeline::contains(&pipelines, TESSCUT))
        {
            let mut merged = rows;
            merged.extend(cutouts.iter().cloned());
            SearchResult::new(merged)
        } else {
            SearchResult::new(rows)
        };
        tracing::info!(target_name = %request.target, rows = result.len(), "search complete");

        Ok(MissionSearch {
            request,
            position,
            result,
            cutouts,
            tesscut,
            warnings,
        })
    }

    fn pipelines(
        &self,
        request: &SearchRequest,
        strategy: Option<&MissionStrategy>,
        hlsp: bool,
    ) -> Vec<String> {
        if !request.pipeline.is_empty() {
            return pipeline::canonicalize_all(&request.pipeline);
        }
        match (strategy, hlsp) {
            (Some(strategy), _) => strategy.default_pipelines(hlsp),
            (None, true) => Vec::new(),
            (None, false) => pipeline::canonicalize_all(
                Mission::ALL
                    .iter()
                    .flat_map(|mission| MissionStrategy::for_mission(*mission).default_pipelines(false)),
            ),
        }
    }

    fn cutouts(
        &self,
        request: &SearchRequest,
        filters: &QueryFilters,
        rows: &[Observation],
        position: SkyCoord,
        warnings: &mut Vec<SearchWarning>,
    ) -> Result<(TesscutState, SearchResult), LkError> {
        let state = TesscutState::query(&self.footprint, &position, &request.sector);
        if let TesscutState::Unavailable(message) = &state {
            warnings.push(SearchWarning::new(format!(
                "TESS cutouts unavailable: {message}"
            )));
        }
        if state.sectors().is_empty() {
            return Ok((state, SearchResult::empty()));
        }

        let target_name = cutout_target_name(request, rows);
        let raw: Vec<RawProduct> = tesscut::candidates(
            &target_name,
            &position,
            state.sectors(),
            self.config.tesscut_size,
            &self.config.tesscut_base_url,
        );
        // Cutouts are always listed by `tesscut()`, whatever the pipeline filter.
        let cutout_filters = QueryFilters {
            pipelines: Vec::new(),
            search_radius: None,
            target_id: None,
            ..filters.clone()
        };
        let cutouts = SearchResult::new(normalize::normalize(raw, &cutout_filters)?);
        Ok((state, cutouts))
    }
}

fn requests_hlsp(pipelines: &[String]) -> bool {
    pipelines.iter().any(|name| {
        !Mission::ALL
            .iter()
            .any(|mission| MissionStrategy::for_mission(*mission).mission_pipeline == name.as_str())
            && name.as_str() != TESSCUT
    })
}

fn cutout_target_name(request: &SearchRequest, rows: &[Observation]) -> String {
    if let Some(id) = request.target.catalog_id() {
        return id.canonical_name();
    }
    rows.iter()
        .find(|row| row.mission == Mission::Tess)
        .map(|row| row.target_name.clone())
        .unwrap_or_else(|| request.target.to_string())
}

/// Outcome of one search: the canonical result plus the request that made it.
#[derive(Debug, Clone)]
pub struct MissionSearch {
    request: SearchRequest,
    position: SkyCoord,
    result: SearchResult,
    cutouts: SearchResult,
    tesscut: TesscutState,
    warnings: Vec<SearchWarning>,
}

impl MissionSearch {
    pub fn request(&self) -> &SearchRequest {
        &self.request
    }

    pub fn position(&self) -> SkyCoord {
        self.position
    }

    pub fn result(&self) -> &SearchResult {
        &self.result
    }

    pub fn into_result(self) -> SearchResult {
        self.result
    }

    pub fn table(&self) -> &[Observation] {
        self.result.table()
    }

    pub fn len(&self) -> usize {
        self.result.len()
    }

    pub fn is_empty(&self) -> bool {
        self.result.is_empty()
    }

    pub fn cubedata(&self) -> SearchResult {
        self.result.cubedata()
    }

    pub fn timeseries(&self) -> SearchResult {
        self.result.timeseries()
    }

    pub fn filter_table(&self, filter: &TableFilter) -> SearchResult {
        self.result.filter_table(filter)
    }

    /// Non-fatal problems met while searching.
    pub fn warnings(&self) -> &[SearchWarning] {
        &self.warnings
    }

    pub fn download<T: TransferClient>(
        &self,
        downloader: &Downloader<T>,
        options: &DownloadOptions,
    ) -> Result<Manifest, LkError> {
        self.result.download(downloader, options)
    }
}

impl fmt::Display for MissionSearch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.result)
    }
}

macro_rules! facade {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $name(MissionSearch);

        impl $name {
            pub fn into_inner(self) -> MissionSearch {
                self.0
            }
        }

        impl Deref for $name {
            type Target = MissionSearch;

            fn deref(&self) -> &MissionSearch {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

facade!(
    /// Search across every mission.
    MastSearch
);
facade!(
    /// Kepler search; observing periods are quarters.
    KeplerSearch
);
facade!(
    /// K2 search; observing periods are campaigns.
    K2Search
);
facade!(
    /// TESS search; observing periods are sectors. Includes FFI cutouts.
    TessSearch
);

impl TessSearch {
    pub fn tesscut_state(&self) -> &TesscutState {
        &self.0.tesscut
    }

    /// Cutout candidates only. A footprint that misses the target is a
    /// `Search` error; an unreachable footprint service is `Transport`.
    pub fn tesscut(&self) -> Result<SearchResult, LkError> {
        let no_data = || {
            LkError::Search(tesscut::no_data_message(
                &self.0.request.target.to_string(),
                &self.0.request.sector,
            ))
        };
        match &self.0.tesscut {
            TesscutState::Unavailable(message) => Err(LkError::Transport(message.clone())),
            TesscutState::Found(_) if !self.0.cutouts.is_empty() => Ok(self.0.cutouts.clone()),
            _ => Err(no_data()),
        }
    }
}
