use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use chrono::{DateTime, TimeZone, Utc};
use pretty_assertions::assert_eq;

use bejadict::config::{ConfigFile, LayoutConfig, SourceConfig};
use bejadict::core::diagnostics::Stage;
use bejadict::core::model::{Corpus, CrossReference, PartOfSpeech, RawPage};
use bejadict::coverage::coverage;
use bejadict::lookup::{lookup, LookupOptions};
use bejadict::pipeline::{build_run, export_run, run_pipeline, PipelineConfig, RunOutput};
use bejadict::Severity;

fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

fn starred() -> SourceConfig {
    SourceConfig::beja_arabic_english()
}

fn hanging() -> SourceConfig {
    SourceConfig::beja_english_hanging()
}

fn run_sources(sources: Vec<SourceConfig>, pages: Vec<Vec<RawPage>>) -> Result<RunOutput> {
    let config = PipelineConfig::new(sources, PathBuf::from("unused"), fixed_time());
    build_run(&config, &pages)
}

fn run_starred(pages: &[(usize, &str)]) -> Result<RunOutput> {
    let pages = pages
        .iter()
        .map(|(idx, text)| RawPage::new("beja-arabic", *idx, *text))
        .collect();
    run_sources(vec![starred()], vec![pages])
}

fn corpus_of<'a>(run: &'a RunOutput, source: &str) -> &'a Corpus {
    &run.source(source).expect("source output").corpus
}

/// Two pages with one headword each give two entries spanning pages 1-2.
#[test]
fn scenario_two_pages_two_entries() -> Result<()> {
    let run = run_starred(&[(1, "gwida * many"), (2, "hadal * lion")])?;
    let corpus = corpus_of(&run, "beja-arabic");

    assert_eq!(corpus.len(), 2);
    let gwida = corpus.get("gwida").expect("gwida entry");
    let hadal = corpus.get("hadal").expect("hadal entry");
    assert_eq!(gwida.part_of_speech, PartOfSpeech::Unknown);
    assert_eq!(hadal.part_of_speech, PartOfSpeech::Unknown);
    assert_eq!(gwida.senses[0].gloss, "many");
    assert_eq!(hadal.senses[0].gloss, "lion");
    assert_eq!(gwida.provenance.page_start, 1);
    assert_eq!(hadal.provenance.page_end, 2);
    assert_eq!(run.count(Severity::Error), 0);
    Ok(())
}

/// A page of nothing but running heads is empty, not a failure.
#[test]
fn scenario_header_only_page() -> Result<()> {
    let run = run_starred(&[(5, "BEJA - ARABIC\n\nBEJA - ARABIC\n17")])?;
    let output = run.source("beja-arabic").expect("source output");

    assert!(output.corpus.is_empty());
    assert_eq!(run.count(Severity::Error), 0);
    let empty: Vec<_> = output
        .diagnostics
        .iter()
        .filter(|d| d.stage == Stage::Normalize)
        .collect();
    assert_eq!(empty.len(), 1);
    assert_eq!(empty[0].severity, Severity::Info);
    assert_eq!(empty[0].context.page, Some(5));
    Ok(())
}

/// "see B" on entry A resolves to B's identifier.
#[test]
fn scenario_see_reference_resolves() -> Result<()> {
    let run = run_starred(&[(1, "aada * habit\naagil * elder * see aada")])?;
    let corpus = corpus_of(&run, "beja-arabic");

    let aagil = corpus.get("aagil").expect("aagil entry");
    assert_eq!(
        aagil.cross_references,
        vec![CrossReference::Resolved("aada".to_string())]
    );
    assert!(aagil.issues.is_empty());
    Ok(())
}

/// Body text with no headword before it is dropped with an error, and the
/// run still completes.
#[test]
fn scenario_headless_span_is_excluded() -> Result<()> {
    let run = run_starred(&[(1, "  stray gloss text\ngwida * many")])?;
    let corpus = corpus_of(&run, "beja-arabic");

    assert_eq!(corpus.len(), 1);
    assert!(corpus.get("gwida").is_some());
    let errors: Vec<_> = run
        .diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].stage, Stage::Extract);
    assert!(errors[0].message.contains("stray gloss text"));
    Ok(())
}

#[test]
fn identical_input_gives_identical_json() -> Result<()> {
    let pages = [
        (1, "aagil, aagal * elder, old man (aagil tak) * شيخ * N m Cush * Er Su"),
        (2, "gwida * many * Adj\ngwida * much\nhadal * lion * see hadaab"),
    ];
    let first = run_starred(&pages)?;
    let second = run_starred(&pages)?;

    let first_json = first.merged.as_ref().expect("merged corpus").to_json()?;
    let second_json = second.merged.as_ref().expect("merged corpus").to_json()?;
    assert_eq!(first_json, second_json);
    assert_eq!(
        serde_json::to_string(&first.diagnostics)?,
        serde_json::to_string(&second.diagnostics)?
    );
    Ok(())
}

#[test]
fn corpus_json_round_trips() -> Result<()> {
    let run = run_starred(&[(
        1,
        "aagil, aagal * elder, old man (aagil tak) * شيخ * N m Cush * Er Su\nbaab * door * see nowhere",
    )])?;
    let corpus = corpus_of(&run, "beja-arabic");

    let back = Corpus::from_json(&corpus.to_json()?)?;
    assert_eq!(&back, corpus);

    let aagil = back.get("aagil").expect("aagil entry");
    assert_eq!(aagil.variants.iter().collect::<Vec<_>>(), vec!["aagal"]);
    assert_eq!(aagil.part_of_speech, PartOfSpeech::Noun);
    assert_eq!(aagil.senses[0].example.as_deref(), Some("aagil tak"));
    Ok(())
}

#[test]
fn every_reference_is_closed_or_reported() -> Result<()> {
    let run = run_starred(&[(
        1,
        "aada * habit\naagil * elder * see aada\nbaab * door * see nowhere, aada",
    )])?;
    let corpus = corpus_of(&run, "beja-arabic");

    let mut unresolved = 0;
    for entry in corpus.entries.values() {
        for reference in &entry.cross_references {
            match reference {
                CrossReference::Resolved(id) => assert!(corpus.get(id).is_some()),
                CrossReference::Unresolved { unresolved: surface } => {
                    unresolved += 1;
                    assert!(
                        run.diagnostics
                            .iter()
                            .any(|d| d.stage == Stage::Resolve && d.message.contains(surface.as_str())),
                        "no diagnostic for '{surface}'"
                    );
                }
            }
        }
    }
    assert_eq!(unresolved, 1);

    let baab = corpus.get("baab").expect("baab entry");
    assert_eq!(
        baab.cross_references,
        vec![
            CrossReference::unresolved("see nowhere"),
            CrossReference::Resolved("aada".to_string()),
        ]
    );
    assert_eq!(baab.issues, vec!["unresolved-cross-reference".to_string()]);
    Ok(())
}

#[test]
fn hanging_layout_end_to_end() -> Result<()> {
    let pages = vec![
        RawPage::new(
            "beja-english",
            1,
            "aagil, aagal n. elder, old man (aagil tak); see hadal\nhadal n. lion\n    of the desert",
        ),
        RawPage::new("beja-english", 2, "12\nhadal n. a second lion"),
    ];
    let run = run_sources(vec![hanging()], vec![pages])?;
    let corpus = corpus_of(&run, "beja-english");

    let ids: Vec<&str> = corpus.entries.keys().map(String::as_str).collect();
    assert_eq!(ids, vec!["aagil", "hadal", "hadal-2"]);

    let aagil = corpus.get("aagil").expect("aagil entry");
    assert_eq!(aagil.part_of_speech, PartOfSpeech::Noun);
    assert_eq!(aagil.variants.iter().collect::<Vec<_>>(), vec!["aagal"]);
    assert_eq!(aagil.senses[0].gloss, "elder, old man");
    assert_eq!(aagil.senses[0].example.as_deref(), Some("aagil tak"));
    assert_eq!(
        aagil.cross_references,
        vec![CrossReference::Resolved("hadal".to_string())]
    );

    assert_eq!(corpus.get("hadal").expect("hadal").senses[0].gloss, "lion of the desert");
    assert_eq!(corpus.get("hadal-2").expect("hadal-2").provenance.page_start, 2);
    assert_eq!(run.count(Severity::Error), 0);
    // two homographs make the reference ambiguous
    assert!(run
        .diagnostics
        .iter()
        .any(|d| d.stage == Stage::Resolve && d.message.contains("ambiguous")));
    Ok(())
}

/// Two printed columns are read one after the other, each with its own
/// wrapped lines.
#[test]
fn multi_column_page_reads_each_column() -> Result<()> {
    let mut source = starred();
    if let LayoutConfig::Starred(layout) = &mut source.layout {
        layout.column_boundaries = vec![30];
    }
    let text = format!(
        "{:<30}{}\n{:<30}{}",
        "gwida * Adj * many", "hadal * N * lion", "  people", "  of the desert"
    );
    let run = run_sources(
        vec![source],
        vec![vec![RawPage::new("beja-arabic", 1, text)]],
    )?;
    let corpus = corpus_of(&run, "beja-arabic");

    let ids: Vec<&str> = corpus.entries.keys().map(String::as_str).collect();
    assert_eq!(ids, vec!["gwida", "hadal"]);
    let gwida = corpus.get("gwida").expect("gwida entry");
    assert_eq!(gwida.part_of_speech, PartOfSpeech::Adjective);
    assert_eq!(gwida.senses[0].gloss, "many people");
    let hadal = corpus.get("hadal").expect("hadal entry");
    assert_eq!(hadal.part_of_speech, PartOfSpeech::Noun);
    assert_eq!(hadal.senses[0].gloss, "lion of the desert");
    assert_eq!(run.count(Severity::Error), 0);
    Ok(())
}

/// An indented head zone is body text of the entry above, variants included.
#[test]
fn indented_head_zone_does_not_leak_variants() -> Result<()> {
    let run = run_starred(&[(1, "gwida * many * Adj\n    hadal, hadaal * lion")])?;
    let corpus = corpus_of(&run, "beja-arabic");

    assert_eq!(corpus.len(), 1);
    let gwida = corpus.get("gwida").expect("gwida entry");
    assert!(gwida.variants.is_empty());
    let glosses: Vec<&str> = gwida.senses.iter().map(|s| s.gloss.as_str()).collect();
    assert_eq!(glosses, vec!["many", "hadal, hadaal", "lion"]);
    assert!(run
        .diagnostics
        .iter()
        .any(|d| d.stage == Stage::Segment && d.severity == Severity::Info));
    Ok(())
}

#[test]
fn merge_disambiguates_colliding_ids() -> Result<()> {
    let run = run_sources(
        vec![starred(), hanging()],
        vec![
            vec![RawPage::new("beja-arabic", 1, "gwida * many")],
            vec![RawPage::new("beja-english", 1, "gwida adj. many, much")],
        ],
    )?;
    let merged = run.merged.as_ref().expect("merged corpus");

    let ids: Vec<&str> = merged.entries.keys().map(String::as_str).collect();
    assert_eq!(ids, vec!["gwida", "gwida@beja-english"]);
    assert_eq!(
        merged.get("gwida@beja-english").expect("renamed").provenance.document,
        "beja-english"
    );
    assert_eq!(merged.metadata.sources.len(), 2);
    assert_eq!(merged.metadata.generated_at, "2024-05-01T12:00:00Z");

    let report = coverage(merged);
    assert_eq!(report.common_to_all, 1);
    assert_eq!(report.union, 1);

    let hits = lookup(merged, "gwida", &LookupOptions::default());
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].entry.id, "gwida");
    Ok(())
}

#[test]
fn no_merge_leaves_sources_separate() -> Result<()> {
    let mut config = PipelineConfig::new(vec![starred()], PathBuf::from("unused"), fixed_time());
    config.merge = false;
    let run = build_run(
        &config,
        &[vec![RawPage::new("beja-arabic", 1, "gwida * many")]],
    )?;
    assert!(run.merged.is_none());
    assert_eq!(run.sources.len(), 1);
    Ok(())
}

#[test]
fn exports_every_artifact() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let run = run_starred(&[(1, "aagil * elder * see nowhere")])?;
    export_run(&run, dir.path())?;

    for name in [
        "beja-arabic.json",
        "corpus.json",
        "diagnostics.json",
        "corpus.txt",
        "review.html",
    ] {
        assert!(dir.path().join(name).is_file(), "missing {name}");
    }

    let stored = Corpus::from_json(&fs::read_to_string(dir.path().join("corpus.json"))?)?;
    assert_eq!(Some(&stored), run.merged.as_ref());

    let text = fs::read_to_string(dir.path().join("corpus.txt"))?;
    assert!(text.contains("aagil [aagil] (unknown)"));

    let html = fs::read_to_string(dir.path().join("review.html"))?;
    assert!(html.contains("unresolved cross-reference"));
    assert!(html.contains("<pre class='entry' id='aagil'>"));
    Ok(())
}

#[test]
fn runs_from_a_config_file() -> Result<()> {
    let dir = tempfile::tempdir()?;
    fs::write(
        dir.path().join("dict1.jsonl"),
        "{\"source\": \"dict1\", \"page_idx\": 1, \"text\": \"gwida * many\"}\n\
         {\"source\": \"dict1\", \"page_idx\": 2, \"text\": \"hadal * lion\"}\n",
    )?;
    let config_path = dir.path().join("bejadict.toml");
    fs::write(
        &config_path,
        r#"
        merge = false

        [[source]]
        id = "dict1"
        name = "Beja-Arabic"
        pages = "dict1.jsonl"
        layout = { kind = "starred" }
        "#,
    )?;

    let out = dir.path().join("out");
    let file = ConfigFile::load(&config_path)?;
    let config = PipelineConfig::from_file(file, out.clone(), fixed_time());
    let run = run_pipeline(&config)?;

    assert_eq!(corpus_of(&run, "dict1").len(), 2);
    assert!(out.join("dict1.json").is_file());
    assert!(!out.join("corpus.json").exists());
    Ok(())
}
