mod common;

use assert_matches::assert_matches;

use lksearch::cadence::Cadence;
use lksearch::catalog::ProductKind;
use lksearch::domain::Mission;
use lksearch::error::LkError;
use lksearch::result::TableFilter;
use lksearch::search::SearchRequest;
use lksearch::tesscut::TesscutState;

use common::{MockArchive, MockFootprint, searcher, searcher_with};

fn request(target: &str) -> SearchRequest {
    SearchRequest::parse(target).unwrap()
}

#[test]
fn kepler_long_cadence_history_by_quarter() {
    let searcher = searcher();

    let all = searcher
        .kepler(request("Kepler-10").exptime(Cadence::Long))
        .unwrap();
    assert_eq!(all.timeseries().len(), 15);
    assert_eq!(all.cubedata().len(), 15);

    let one = searcher
        .kepler(request("Kepler-10").exptime(Cadence::Long).quarter(6))
        .unwrap();
    assert_eq!(one.timeseries().len(), 1);
    assert_eq!(one.timeseries().obs_id(), vec!["06"]);

    let missing = searcher
        .kepler(request("Kepler-10").exptime(Cadence::Long).quarter(12))
        .unwrap();
    assert!(missing.timeseries().is_empty());
}

#[test]
fn kepler_short_cadence_months() {
    let searcher = searcher();
    let quarter = searcher
        .kepler(request("Kepler-10").quarter(11).exptime("short".parse::<Cadence>().unwrap()))
        .unwrap();
    assert_eq!(quarter.len(), 3);

    let month = searcher
        .kepler(
            request("Kepler-10")
                .quarter(11)
                .month(2)
                .exptime(Cadence::Short),
        )
        .unwrap();
    assert_eq!(month.len(), 1);
    assert_eq!(month.table()[0].month, Some(2));
    assert!(month.table()[0].product_filename.contains("q11m2"));

    let two_months = searcher
        .kepler(
            request("Kepler-10")
                .quarter(11)
                .month(1)
                .month(3)
                .exptime(Cadence::Short),
        )
        .unwrap();
    assert_eq!(two_months.len(), 2);
}

#[test]
fn no_radius_keeps_only_the_exact_target() {
    let searcher = searcher();

    let exact = searcher.kepler(request("KIC 6507433")).unwrap();
    assert_eq!(exact.len(), 1);
    assert_eq!(exact.result().target_name(), vec!["kplr006507433"]);

    let by_position = searcher.kepler(request("290.01604 41.94553")).unwrap();
    assert_eq!(by_position.len(), 1);

    let wide = searcher
        .kepler(request("KIC 6507433").search_radius(5.0))
        .unwrap();
    assert_eq!(wide.len(), 2);
    assert_eq!(
        wide.result().target_name(),
        vec!["kplr006507433", "kplr006507444"]
    );
    assert!(wide.result().distance()[1] > 1.0);
}

#[test]
fn tess_neighbour_needs_a_radius() {
    let searcher = searcher();
    assert_eq!(searcher.tess(request("TIC 273985862")).unwrap().len(), 1);
    assert_eq!(
        searcher
            .tess(request("TIC 273985862").search_radius(5.0))
            .unwrap()
            .len(),
        2
    );
}

#[test]
fn split_campaign_by_time_windows() {
    let search = searcher()
        .k2(request("EPIC 228162462").campaign(9))
        .unwrap();
    assert_eq!(search.result().obs_id(), vec!["09a", "09b"]);
    assert!(search.table()[0].product_filename.contains("c91"));
}

#[test]
fn split_campaign_from_archive_codes() {
    let search = searcher()
        .k2(request("EPIC 201000001").campaign(10))
        .unwrap();
    assert_eq!(search.result().obs_id(), vec!["10a", "10b"]);
}

#[test]
fn split_campaign_never_invents_a_half() {
    let search = searcher()
        .k2(request("EPIC 203830112").campaign(11))
        .unwrap();
    assert_eq!(search.result().obs_id(), vec!["11b"]);
}

#[test]
fn fast_word_and_twenty_seconds_agree() {
    let searcher = searcher();
    let fast = searcher.tess(request("AU Mic").exptime(Cadence::Fast)).unwrap();
    let numeric = searcher.tess(request("AU Mic").exptime(20.0)).unwrap();
    assert_eq!(fast.len(), 2);
    assert!(fast.result().exptime().iter().all(|exptime| *exptime == 20.0));
    assert_eq!(fast.result(), numeric.result());
}

#[test]
fn pipelines_coexist_for_one_sector() {
    let searcher = searcher();

    let all = searcher.tess(request("TrES-2b")).unwrap();
    let mut pipelines = all.result().pipeline();
    pipelines.sort();
    assert_eq!(pipelines, vec!["QLP", "SPOC", "TESS-SPOC"]);

    let qlp = searcher.tess(request("TrES-2b").pipeline("qlp")).unwrap();
    assert_eq!(qlp.result().pipeline(), vec!["QLP"]);

    let mission_only = searcher.tess(request("TrES-2b").hlsp(false)).unwrap();
    assert_eq!(mission_only.result().pipeline(), vec!["SPOC"]);
}

#[test]
fn tesscut_candidates_join_tess_results() {
    let searcher = searcher_with(MockArchive::default(), MockFootprint::covering(&[14, 26]));

    let search = searcher.tess(request("TrES-2b")).unwrap();
    assert_matches!(search.tesscut_state(), TesscutState::Found(sectors) if sectors.len() == 2);
    assert_eq!(search.len(), 5);

    let cutouts = search.tesscut().unwrap();
    assert_eq!(cutouts.len(), 2);
    assert!(cutouts.pipeline().iter().all(|name| *name == "TESScut"));
    assert_eq!(cutouts.exptime(), vec![1800.0, 1800.0]);
    assert!(cutouts.iter().all(|row| row.kind == ProductKind::Cutout));
    assert_eq!(search.cubedata().len(), 2);

    let one_sector = searcher.tess(request("TrES-2b").sector(26)).unwrap();
    assert_eq!(one_sector.tesscut().unwrap().len(), 1);
    assert_eq!(one_sector.len(), 4);

    let spoc_only = searcher.tess(request("TrES-2b").pipeline("SPOC")).unwrap();
    assert_eq!(spoc_only.len(), 1);
    assert_eq!(spoc_only.tesscut().unwrap().len(), 2);
}

#[test]
fn tesscut_outside_footprint_is_no_data() {
    let searcher = searcher_with(MockArchive::default(), MockFootprint::covering(&[14, 15]));
    let search = searcher.tess(request("TrES-2b").sector(2)).unwrap();
    assert_eq!(search.tesscut_state(), &TesscutState::NotFound);
    assert!(search.is_empty());

    let err = search.tesscut().unwrap_err();
    assert_matches!(&err, LkError::Search(message) if message.contains("No data"));
    assert!(!err.is_transport());
}

#[test]
fn tesscut_transport_failure_is_not_no_data() {
    let searcher = searcher_with(MockArchive::default(), MockFootprint::unavailable());
    let search = searcher.tess(request("TrES-2b")).unwrap();
    assert_eq!(search.len(), 3);
    assert_eq!(search.warnings().len(), 1);

    let err = search.tesscut().unwrap_err();
    assert_matches!(err, LkError::Transport(_));
}

#[test]
fn multi_mission_search() {
    let search = searcher().mast(request("Kepler-10")).unwrap();
    assert_eq!(search.len(), 34);
    let missions = search.result().mission();
    assert_eq!(missions.iter().filter(|mission| **mission == Mission::Kepler).count(), 33);
    assert_eq!(missions.iter().filter(|mission| **mission == Mission::Tess).count(), 1);
    assert!(search.to_string().contains("SearchResult containing 34 data products."));
}

#[test]
fn catalog_id_finds_the_star_in_other_missions() {
    let searcher = searcher();

    let tess = searcher.tess(request("KIC 11904151")).unwrap();
    assert_eq!(tess.result().target_name(), vec!["27677846"]);
    assert_eq!(tess.result().obs_id(), vec!["14"]);

    let all = searcher.mast(request("KIC 11904151")).unwrap();
    assert_eq!(all.len(), 34);
    assert_eq!(
        all.filter_table(&TableFilter::new().mission(Mission::Tess)).len(),
        1
    );

    let by_name = searcher.tess(request("Kepler-10")).unwrap();
    assert_eq!(by_name.result().target_name(), vec!["27677846"]);
}

#[test]
fn nearest_source_is_chosen_per_mission() {
    let searcher = searcher();
    let by_position = searcher.mast(request("285.67942 50.24130")).unwrap();
    let tess = by_position.filter_table(&TableFilter::new().mission(Mission::Tess));
    assert_eq!(tess.len(), 1);
    assert!(tess.distance()[0] > 0.3);
    assert_eq!(
        by_position
            .filter_table(&TableFilter::new().mission(Mission::Kepler))
            .len(),
        33
    );
}

#[test]
fn parameter_vocabulary_is_mission_specific() {
    let searcher = searcher();
    assert_matches!(
        searcher.kepler(request("Kepler-10").sector(1)),
        Err(LkError::Configuration(_))
    );
    assert_matches!(
        searcher.k2(request("EPIC 228162462").month(1)),
        Err(LkError::Configuration(_))
    );
    assert_matches!(
        searcher.tess(request("TrES-2b").quarter(3)),
        Err(LkError::Configuration(_))
    );
    assert_matches!(
        searcher.tess(request("TrES-2b").mission(Mission::Kepler)),
        Err(LkError::Configuration(_))
    );
    assert_matches!(
        searcher.mast(request("TrES-2b").mission(Mission::Tess).quarter(3)),
        Err(LkError::Configuration(_))
    );
    assert!(searcher.mast(request("Kepler-10").quarter(3)).is_ok());
}

#[test]
fn invalid_inputs_are_configuration_errors() {
    let searcher = searcher();
    assert_matches!(
        searcher.kepler(request("Kepler-10").exptime(Cadence::Fast)),
        Err(LkError::Configuration(_))
    );
    assert_matches!(
        searcher.kepler(request("Kepler-10").month(4)),
        Err(LkError::Configuration(_))
    );
    assert_matches!(
        searcher.mast(request("Kepler-10").search_radius(0.0)),
        Err(LkError::Configuration(_))
    );
    assert_matches!(
        "sometimes".parse::<Cadence>(),
        Err(LkError::Configuration(_))
    );
}

#[test]
fn unknown_target_is_a_resolve_error() {
    assert_matches!(
        searcher().mast(request("Nowhere-1")),
        Err(LkError::Resolve(message)) if message.contains("Unable to find")
    );
}

#[test]
fn archive_failure_propagates() {
    let mut archive = MockArchive::default();
    archive.fail = true;
    let err = searcher_with(archive, MockFootprint::covering(&[]))
        .mast(request("Kepler-10"))
        .unwrap_err();
    assert!(err.is_transport());
    assert_matches!(err, LkError::TransportStatus { status: 503, .. });
}

#[test]
fn empty_search_is_not_an_error() {
    let search = searcher()
        .tess(request("KIC 6507433"))
        .unwrap();
    assert!(search.is_empty());
    assert!(search.to_string().contains("No results"));
}
