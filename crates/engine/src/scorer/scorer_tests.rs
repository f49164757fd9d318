use super::*;

fn collection() -> (CollectionStats, Arc<[u32]>) {
    let doc_lens: Arc<[u32]> = Arc::from(vec![6u32, 1, 2, 0, 3, 1, 1, 0, 1, 0].into_boxed_slice());
    let total: u32 = doc_lens.iter().sum();
    let stats = CollectionStats {
        num_docs: doc_lens.len() as u32,
        avg_doc_len: total as f32 / doc_lens.len() as f32,
    };
    (stats, doc_lens)
}

#[test]
fn registry_resolves_every_scorer() {
    let (stats, doc_lens) = collection();
    for name in SCORER_NAMES {
        let params = ScorerParams::new(name);
        assert!(scorer_from_params(&params, stats, Arc::clone(&doc_lens)).is_ok());
    }
    assert!(
        scorer_from_params(&ScorerParams::new("tfidf"), stats, doc_lens).is_err()
    );
}

#[test]
fn bm25_matches_closed_form() {
    let (stats, doc_lens) = collection();
    let scorer = Bm25::new(0.9, 0.4, stats, doc_lens);
    let term = scorer.term_scorer(TermStats { df: 4, cf: 4 }, 1.0);

    // idf = ln(1 + (10 - 4 + 0.5) / (4 + 0.5))
    let idf = (1.0f32 + 6.5 / 4.5).ln();
    let k1 = 0.9f32;
    let b = 0.4f32;
    let avg = 1.5f32;

    for (docid, freq) in [(0u32, 1u32), (1, 1), (4, 2)] {
        let len = [6.0f32, 1.0, 2.0, 0.0, 3.0][docid as usize];
        let f = freq as f32;
        let expected = idf * (k1 + 1.0) * f / (k1 * ((1.0 - b) + b * len / avg) + f);
        let got = term.score(docid, freq);
        assert!(
            (got - expected).abs() < 1e-5,
            "docid {docid}: got {got}, expected {expected}"
        );
    }
}

#[test]
fn bm25_query_weight_scales_linearly() {
    let (stats, doc_lens) = collection();
    let scorer = Bm25::new(0.9, 0.4, stats, doc_lens);
    let stats = TermStats { df: 3, cf: 5 };
    let single = scorer.term_scorer(stats, 1.0);
    let double = scorer.term_scorer(stats, 2.0);
    assert!((double.score(4, 2) - 2.0 * single.score(4, 2)).abs() < 1e-6);
}

#[test]
fn bm25_increases_with_frequency_and_rarity() {
    let (stats, doc_lens) = collection();
    let scorer = Bm25::new(0.9, 0.4, stats, doc_lens);

    let term = scorer.term_scorer(TermStats { df: 3, cf: 5 }, 1.0);
    assert!(term.score(4, 2) > term.score(4, 1));

    let rare = scorer.term_scorer(TermStats { df: 1, cf: 1 }, 1.0);
    let common = scorer.term_scorer(TermStats { df: 9, cf: 20 }, 1.0);
    assert!(rare.score(4, 1) > common.score(4, 1));
}

#[test]
fn qld_matches_closed_form() {
    let (stats, doc_lens) = collection();
    let mu = 1000.0f32;
    let scorer = QueryLikelihood::new(mu, stats, doc_lens);
    let term = scorer.term_scorer(TermStats { df: 4, cf: 5 }, 1.0);

    let p_c = 5.0f32 / 15.0;
    let len = 3.0f32;
    let expected = ((1.0 + 2.0 / (mu * p_c)).ln() + (mu / (len + mu)).ln()).max(0.0);
    assert!((term.score(4, 2) - expected).abs() < 1e-5);
}

#[test]
fn all_models_return_non_negative_scores() {
    let (stats, doc_lens) = collection();
    let params = ["bm25", "qld", "pl2", "dph"];
    for name in params {
        let scorer = scorer_from_params(
            &ScorerParams::new(name),
            stats,
            Arc::clone(&doc_lens),
        )
        .unwrap();
        // Include a very common term, where the information-based models go
        // to zero.
        for term_stats in [
            TermStats { df: 1, cf: 1 },
            TermStats { df: 9, cf: 14 },
        ] {
            let term = scorer.term_scorer(term_stats, 1.0);
            for (docid, freq) in [(0u32, 1u32), (0, 3), (1, 1), (4, 2)] {
                let score = term.score(docid, freq);
                assert!(
                    score >= 0.0 && score.is_finite(),
                    "{name} produced {score} for df={} docid={docid} freq={freq}",
                    term_stats.df
                );
            }
        }
    }
}

#[test]
fn quantized_passes_scores_through() {
    let scorer = Quantized;
    let term = scorer.term_scorer(TermStats { df: 1, cf: 1 }, 1.0);
    assert_eq!(term.score(0, 200), 200.0);
    let weighted = scorer.term_scorer(TermStats { df: 1, cf: 1 }, 0.5);
    assert_eq!(weighted.score(7, 200), 100.0);
}
