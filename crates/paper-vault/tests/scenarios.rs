//! End-to-end download scenarios.

use chrono::Duration;
use paper_vault::core::{AccessOutcome, DenialReason};
use paper_vault::render::inspect;
use paper_vault::store::{AuditLog, DocumentStore};
use paper_vault::{AccessError, VaultError};
use paper_vault_testkit::{
    candidate_centre, exam_start, paper, sample_pdf, sample_pdf_with_sizes, TestVault, A4, LETTER,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

#[tokio::test]
async fn test_scenario_a_undistributed_is_denied() {
    init_tracing();
    let fixture = TestVault::memory();
    let id = fixture
        .upload(paper("History Paper I"), sample_pdf(2))
        .await
        .unwrap()
        .id;

    let err = fixture
        .download(&id, &candidate_centre(), exam_start())
        .await
        .unwrap_err();
    assert!(matches!(err, VaultError::Access(AccessError::NotDistributed)));
    assert!(err.is_denial());
    assert!(fixture.scratch_files().is_empty());

    let attempts = fixture.access_attempts(&id).await.unwrap();
    assert_eq!(attempts.len(), 1);
    assert_eq!(
        attempts[0].outcome,
        AccessOutcome::Denied(DenialReason::NotDistributed)
    );
    assert_eq!(attempts[0].actor_id, candidate_centre());
}

#[tokio::test]
async fn test_scenario_b_inside_window_returns_pdf() {
    init_tracing();
    let fixture = TestVault::memory();
    let t = exam_start();
    let id = fixture
        .upload(paper("History Paper I"), sample_pdf(3))
        .await
        .unwrap()
        .id;
    fixture
        .set_distribution_window(&id, t, t + Duration::hours(2))
        .await
        .unwrap();

    let download = fixture
        .download(&id, &candidate_centre(), t + Duration::hours(1))
        .await
        .unwrap();
    assert_eq!(download.document_id(), id);
    assert_eq!(download.page_count(), 3);
    assert!(!download.is_empty());

    let bytes = download.into_bytes().unwrap();
    assert!(bytes.starts_with(b"%PDF-"));

    let attempts = fixture.access_attempts(&id).await.unwrap();
    assert_eq!(attempts.len(), 1);
    assert!(attempts[0].outcome.is_granted());
}

#[tokio::test]
async fn test_scenario_c_after_window_is_denied_without_decrypting() {
    init_tracing();
    let fixture = TestVault::memory();
    let t = exam_start();
    let id = fixture
        .upload(paper("History Paper I"), sample_pdf(1))
        .await
        .unwrap()
        .id;
    fixture.distribute(&id, t).await.unwrap();

    let err = fixture
        .download(&id, &candidate_centre(), t + Duration::hours(3))
        .await
        .unwrap_err();
    match err {
        VaultError::Access(AccessError::WindowExpired { closed_at }) => {
            assert_eq!(closed_at, t + Duration::hours(2));
        }
        other => panic!("expected WindowExpired, got {other:?}"),
    }
    assert!(fixture.scratch_files().is_empty());
    assert_eq!(
        fixture.access_attempts(&id).await.unwrap()[0].outcome,
        AccessOutcome::Denied(DenialReason::WindowExpired)
    );
}

#[tokio::test]
async fn test_scenario_d_ten_pages_all_marked() {
    init_tracing();
    let fixture = TestVault::memory();
    let t = exam_start();
    let id = fixture
        .upload(paper("Mathematics Paper II"), sample_pdf(10))
        .await
        .unwrap()
        .id;
    fixture.distribute(&id, t).await.unwrap();

    let bytes = fixture
        .download(&id, &candidate_centre(), t + Duration::minutes(10))
        .await
        .unwrap()
        .into_bytes()
        .unwrap();

    let pages = inspect(&bytes, "Confidential").unwrap();
    assert_eq!(pages.len(), 10);
    for page in &pages {
        assert!(page.marker_found, "page {} unmarked", page.page);
        assert_eq!((page.width, page.height), A4);
        assert!((page.opacity.unwrap() - 0.3).abs() < 1e-4);
        assert!((page.rotation_degrees.unwrap() + 45.0).abs() < 1e-2);
    }
}

#[tokio::test]
async fn test_too_early_reports_opening_time() {
    let fixture = TestVault::memory();
    let t = exam_start();
    let id = fixture
        .upload(paper("Geography Paper I"), sample_pdf(1))
        .await
        .unwrap()
        .id;
    fixture.distribute(&id, t).await.unwrap();

    let err = fixture
        .download(&id, &candidate_centre(), t - Duration::minutes(1))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        VaultError::Access(AccessError::TooEarly { opens_at }) if opens_at == t
    ));
    assert!(err.client_message().contains(&t.to_string()));
}

#[tokio::test]
async fn test_window_bounds_are_inclusive() {
    let fixture = TestVault::memory();
    let t = exam_start();
    let id = fixture
        .upload(paper("Art Paper I"), sample_pdf(1))
        .await
        .unwrap()
        .id;
    fixture.distribute(&id, t).await.unwrap();

    for now in [t, t + Duration::hours(2)] {
        fixture.download(&id, &candidate_centre(), now).await.unwrap();
    }
    assert!(fixture
        .download(&id, &candidate_centre(), t + Duration::hours(2) + Duration::seconds(1))
        .await
        .is_err());
}

#[tokio::test]
async fn test_page_dimensions_preserved_for_mixed_sizes() {
    let fixture = TestVault::memory();
    let t = exam_start();
    let id = fixture
        .upload(paper("Music Paper I"), sample_pdf_with_sizes(&[A4, LETTER, A4]))
        .await
        .unwrap()
        .id;
    fixture.distribute(&id, t).await.unwrap();

    let bytes = fixture
        .download(&id, &candidate_centre(), t)
        .await
        .unwrap()
        .into_bytes()
        .unwrap();
    let sizes: Vec<_> = inspect(&bytes, "Confidential")
        .unwrap()
        .into_iter()
        .map(|p| (p.width, p.height))
        .collect();
    assert_eq!(sizes, vec![A4, LETTER, A4]);
}

#[tokio::test]
async fn test_custom_marker_text_is_drawn() {
    let fixture = TestVault::memory_with(|c| c.marker_text = "Centre 042 only".to_string());
    let t = exam_start();
    let id = fixture
        .upload(paper("Drama Paper I"), sample_pdf(2))
        .await
        .unwrap()
        .id;
    fixture.distribute(&id, t).await.unwrap();

    let bytes = fixture
        .download(&id, &candidate_centre(), t)
        .await
        .unwrap()
        .into_bytes()
        .unwrap();
    assert!(inspect(&bytes, "Centre 042 only")
        .unwrap()
        .iter()
        .all(|p| p.marker_found));
}

#[tokio::test]
async fn test_sqlite_backed_vault_end_to_end() {
    init_tracing();
    let fixture = TestVault::sqlite();
    let t = exam_start();
    let id = fixture
        .upload(paper("Economics Paper I"), sample_pdf(4))
        .await
        .unwrap()
        .id;
    fixture.distribute(&id, t).await.unwrap();

    let download = fixture
        .download(&id, &candidate_centre(), t + Duration::minutes(30))
        .await
        .unwrap();
    assert_eq!(download.page_count(), 4);
    drop(download);

    fixture
        .download(&id, &candidate_centre(), t + Duration::hours(5))
        .await
        .unwrap_err();

    let outcomes: Vec<_> = fixture
        .store()
        .attempts_for(&id)
        .await
        .unwrap()
        .into_iter()
        .map(|a| a.outcome)
        .collect();
    assert_eq!(
        outcomes,
        vec![
            AccessOutcome::Granted,
            AccessOutcome::Denied(DenialReason::WindowExpired)
        ]
    );
    assert!(fixture.store().get_document(&id).await.unwrap().is_some());
    assert!(fixture.scratch_files().is_empty());
}

#[tokio::test]
async fn test_sqlite_window_bounds_keep_sub_millisecond_precision() {
    let fixture = TestVault::sqlite();
    let start = exam_start() + Duration::microseconds(700);
    let end = start + Duration::hours(2);
    let id = fixture
        .upload(paper("Latin Paper I"), sample_pdf(1))
        .await
        .unwrap()
        .id;
    fixture.set_distribution_window(&id, start, end).await.unwrap();

    let actor = candidate_centre();
    assert_eq!(
        fixture
            .log_access(&id, &actor, start - Duration::microseconds(300))
            .await
            .unwrap(),
        AccessOutcome::Denied(DenialReason::TooEarly)
    );
    assert_eq!(
        fixture.log_access(&id, &actor, start).await.unwrap(),
        AccessOutcome::Granted
    );
    assert_eq!(
        fixture.log_access(&id, &actor, end).await.unwrap(),
        AccessOutcome::Granted
    );
    assert_eq!(
        fixture
            .log_access(&id, &actor, end + Duration::nanoseconds(1))
            .await
            .unwrap(),
        AccessOutcome::Denied(DenialReason::WindowExpired)
    );

    let narrow = fixture
        .set_distribution_window(&id, start, start + Duration::microseconds(500))
        .await
        .unwrap();
    assert_eq!(
        narrow.distribution_window.unwrap().duration(),
        Duration::microseconds(500)
    );
}

#[tokio::test]
async fn test_replaced_content_is_what_downloads() {
    let fixture = TestVault::memory();
    let t = exam_start();
    let id = fixture
        .upload(paper("Latin Paper I"), sample_pdf(2))
        .await
        .unwrap()
        .id;
    fixture.distribute(&id, t).await.unwrap();
    let summary = fixture.replace_content(&id, sample_pdf(5)).await.unwrap();
    assert_eq!(summary.version, 2);
    // The window survives a content swap.
    assert!(summary.distribution_window.is_some());

    let download = fixture.download(&id, &candidate_centre(), t).await.unwrap();
    assert_eq!(download.version(), 2);
    assert_eq!(download.page_count(), 5);
    assert_eq!(fixture.artifact_files().len(), 1);
}
