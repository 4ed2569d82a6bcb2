use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use tempfile::TempDir;

use medrec_core::config::{DedupPolicy, RecommenderSettings, Settings, SimilarityStrategy};
use medrec_core::error::Error;
use medrec_core::types::DrugRecord;
use medrec_hybrid::{LazyRecommender, Recommender};

fn abc() -> Vec<DrugRecord> {
    vec![
        DrugRecord::new("DrugA", "Pain", "Great relief", 9.0),
        DrugRecord::new("DrugB", "Pain", "Works well", 8.0),
        DrugRecord::new("DrugC", "Allergy", "No effect", 3.0),
    ]
}

fn names(recs: &[medrec_core::types::Recommendation]) -> Vec<&str> {
    recs.iter().map(|r| r.drug_name.as_str()).collect()
}

#[test]
fn three_drug_scenario_ranks_shared_condition_first() {
    let rec = Recommender::build(abc(), &RecommenderSettings::default()).expect("build");
    let out = rec.recommend("DrugA", 2).expect("recommend");
    assert_eq!(names(&out), vec!["DrugB", "DrugC"]);
    assert!(out[0].similarity_score > out[1].similarity_score);
    assert_eq!(out[1].similarity_score, 0.0);
    assert_eq!(out[0].condition, "Pain");
    assert_eq!(out[0].rating, 8.0);
    assert_eq!(out[0].review_snippet, "Works well");
}

#[test]
fn lookup_ignores_case_and_absent_names_are_not_found() {
    let rec = Recommender::build(abc(), &RecommenderSettings::default()).expect("build");
    let expected = rec.recommend("DrugA", 5).unwrap();
    for q in ["druga", "DRUGA", "dRuGa"] {
        assert_eq!(rec.recommend(q, 5).unwrap(), expected);
    }
    for q in ["aspirin", "ASPIRIN", "AsPiRiN"] {
        let err = rec.recommend(q, 5).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)), "{q}: {err:?}");
    }
}

#[test]
fn never_returns_query_and_respects_top_n() {
    let rec = Recommender::build(abc(), &RecommenderSettings::default()).expect("build");
    for name in rec.names() {
        for top_n in 0..5 {
            let out = rec.recommend(&name, top_n).unwrap();
            assert!(out.len() <= top_n);
            assert!(out.iter().all(|r| !r.drug_name.eq_ignore_ascii_case(&name)));
            assert!(out.windows(2).all(|w| w[0].similarity_score >= w[1].similarity_score));
        }
    }
}

#[test]
fn top_n_beyond_corpus_returns_all_others_without_padding() {
    let rec = Recommender::build(abc(), &RecommenderSettings::default()).expect("build");
    let out = rec.recommend("DrugC", 50).unwrap();
    assert_eq!(out.len(), 2);
}

#[test]
fn duplicate_rows_do_not_echo_the_query_twin() {
    let mut records = abc();
    records.insert(1, DrugRecord::new("DrugA", "Pain", "Great relief", 9.0));
    let settings = RecommenderSettings { dedup: DedupPolicy::KeepAll, ..Default::default() };
    let rec = Recommender::build(records, &settings).expect("build");
    assert_eq!(rec.store().len(), 4);
    let out = rec.recommend("DrugA", 3).unwrap();
    assert_eq!(names(&out), vec!["DrugB", "DrugC"]);

    let deduped = Recommender::build(abc().into_iter().chain(abc()).collect(), &RecommenderSettings::default()).unwrap();
    assert_eq!(deduped.store().len(), 3);
    assert_eq!(names(&deduped.recommend("DrugA", 3).unwrap()), vec!["DrugB", "DrugC"]);
}

#[test]
fn output_is_deterministic_and_strategies_agree() {
    let mut records = abc();
    records.push(DrugRecord::new("DrugD", "Pain", "Meh", 8.0));
    records.push(DrugRecord::new("DrugE", "Pain", "Meh", 8.0));
    let on_demand = Recommender::build(records.clone(), &RecommenderSettings::default()).unwrap();
    let precomputed = Recommender::build(
        records,
        &RecommenderSettings { strategy: SimilarityStrategy::Precomputed, ..Default::default() },
    )
    .unwrap();
    assert!(precomputed.is_precomputed());
    let first = on_demand.recommend("DrugA", 4).unwrap();
    for _ in 0..5 {
        assert_eq!(on_demand.recommend("DrugA", 4).unwrap(), first);
    }
    assert_eq!(precomputed.recommend("DrugA", 4).unwrap(), first);
    // B, D and E tie; original order is kept.
    assert_eq!(names(&first)[..3], ["DrugB", "DrugD", "DrugE"]);
}

#[test]
fn review_snippet_is_bounded() {
    let long_review = "word ".repeat(200);
    let records = vec![
        DrugRecord::new("Zoloft", "Depression", "fine", 7.0),
        DrugRecord::new("Lexapro", "Depression", long_review.clone(), 6.0),
    ];
    let rec = Recommender::build(records, &RecommenderSettings::default()).unwrap();
    let out = rec.recommend("zoloft", 5).unwrap();
    assert_eq!(out.len(), 1);
    let snippet = &out[0].review_snippet;
    assert!(snippet.chars().count() <= 303);
    assert!(snippet.ends_with("..."));
    assert!(long_review.starts_with(&snippet[..snippet.len() - 3]));
}

#[test]
fn recommendation_serializes_with_stable_field_names() {
    let rec = Recommender::build(abc(), &RecommenderSettings::default()).unwrap();
    let out = rec.recommend_default("DrugA").unwrap();
    let json = serde_json::to_value(&out[0]).unwrap();
    for key in ["drugName", "condition", "rating", "reviewSnippet", "similarityScore"] {
        assert!(json.get(key).is_some(), "missing {key}");
    }
}

#[test]
fn initialize_prefers_snapshot_and_falls_back_to_dataset() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join("drugs.csv"),
        "drugName,condition,review,rating\nDrugA,Pain,Great relief,9\nDrugB,Pain,Works well,8\nDrugC,Allergy,No effect,3\n",
    )
    .unwrap();
    let mut settings = Settings::default();
    settings.data.dataset_path = Some("drugs.csv".to_string());
    settings.data.snapshot_path = Some("cache/snapshot.json".to_string());

    let from_dataset = Recommender::initialize(&settings, tmp.path()).expect("dataset");
    assert!(!from_dataset.is_precomputed());
    let expected = from_dataset.recommend("DrugA", 2).unwrap();

    from_dataset.snapshot(true).unwrap().save(&tmp.path().join("cache/snapshot.json")).unwrap();
    fs::remove_file(tmp.path().join("drugs.csv")).unwrap();

    let from_snapshot = Recommender::initialize(&settings, tmp.path()).expect("snapshot");
    assert!(from_snapshot.is_precomputed());
    assert_eq!(from_snapshot.recommend("DrugA", 2).unwrap(), expected);
}

#[test]
fn snapshot_with_stale_rating_weight_is_rebuilt() {
    let stored = Recommender::build(abc(), &RecommenderSettings::default()).expect("build");
    let snapshot = stored.snapshot(true).expect("snapshot");

    let lexical_only = RecommenderSettings { rating_weight: 0.0, ..RecommenderSettings::default() };
    let restored = Recommender::from_snapshot(snapshot, &lexical_only).expect("restore");
    assert_eq!(restored.features().rating_weight(), 0.0);
    assert!(!restored.is_precomputed());

    let fresh = Recommender::build(abc(), &lexical_only).expect("build");
    let out = restored.recommend("DrugA", 2).unwrap();
    assert_eq!(out, fresh.recommend("DrugA", 2).unwrap());
    assert_eq!(names(&out), vec!["DrugB", "DrugC"]);
    assert_eq!(out[1].similarity_score, 0.0);
}

#[test]
fn non_finite_rating_fails_build() {
    let mut records = abc();
    records[2].rating = f64::NAN;
    let err = Recommender::build(records, &RecommenderSettings::default()).err().expect("NaN rating must fail");
    assert!(matches!(err, Error::Initialization(_)));
}

#[test]
fn initialize_without_sources_fails() {
    let tmp = TempDir::new().unwrap();
    let err = Recommender::initialize(&Settings::default(), tmp.path()).err().expect("no sources");
    assert!(matches!(err, Error::Initialization(_)));
}

#[test]
fn lazy_recommender_builds_once_under_contention() {
    let builds = Arc::new(AtomicUsize::new(0));
    let counter = builds.clone();
    let lazy = Arc::new(LazyRecommender::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Recommender::build(abc(), &RecommenderSettings::default())
    }));
    assert!(!lazy.is_initialized());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let lazy = lazy.clone();
            thread::spawn(move || lazy.recommend("drugb", 1).unwrap())
        })
        .collect();
    for h in handles {
        assert_eq!(h.join().unwrap()[0].drug_name, "DrugA");
    }
    assert_eq!(builds.load(Ordering::SeqCst), 1);
    assert!(lazy.is_initialized());
}

#[test]
fn lazy_recommender_retries_after_failed_build() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = attempts.clone();
    let lazy = LazyRecommender::new(move || {
        if counter.fetch_add(1, Ordering::SeqCst) == 0 {
            Recommender::build(vec![], &RecommenderSettings::default())
        } else {
            Recommender::build(abc(), &RecommenderSettings::default())
        }
    });
    assert!(matches!(lazy.get().err(), Some(Error::Initialization(_))));
    assert!(!lazy.is_initialized());
    assert!(lazy.get().is_ok());
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}
