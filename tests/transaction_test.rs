//! Unit-of-work guarantees of `TransactionCoordinator::run_atomic`.

mod common;

use assert_matches::assert_matches;
use common::{create_command, line, TestContext};
use return_orders::{ErrorKind, ServiceError};

#[tokio::test]
async fn failing_line_insert_leaves_nothing_behind() {
    let ctx = TestContext::new().await;
    let coordinator = ctx.service.coordinator().clone();
    let repo = ctx.service.repository();

    // SKU2 appears twice so the third insert hits the composite key.
    let cmd = create_command(
        "ATOM-1",
        vec![line("SKU1", 5, 1), line("SKU2", 5, 1), line("SKU2", 5, 2)],
    );
    let (header, lines) = cmd.to_models(ctx.now());

    let result = coordinator
        .run_atomic(move |txn| {
            Box::pin(async move {
                repo.create(txn, &header, &lines).await?;
                Ok(())
            })
        })
        .await;
    assert_matches!(result, Err(ServiceError::Conflict(_)));

    assert_matches!(
        ctx.service.get("ATOM-1").await,
        Err(ServiceError::NotFound(_))
    );
}

#[tokio::test]
async fn error_returned_from_closure_rolls_back() {
    let ctx = TestContext::new().await;
    let coordinator = ctx.service.coordinator().clone();
    let repo = ctx.service.repository();
    let (header, lines) = create_command("ATOM-2", vec![line("SKU1", 5, 1)]).to_models(ctx.now());

    let result: Result<(), ServiceError> = coordinator
        .run_atomic(move |txn| {
            Box::pin(async move {
                repo.create(txn, &header, &lines).await?;
                assert!(repo.exists(txn, "ATOM-2").await?);
                Err(ServiceError::ValidationError("abort".into()))
            })
        })
        .await;
    assert_matches!(result, Err(ServiceError::ValidationError(msg)) if msg == "abort");

    let repo = ctx.service.repository();
    assert!(!repo
        .exists(ctx.service.coordinator().connection(), "ATOM-2")
        .await
        .unwrap());
}

#[tokio::test]
async fn panic_inside_closure_rolls_back_and_propagates() {
    let ctx = TestContext::new().await;
    let coordinator = ctx.service.coordinator().clone();
    let repo = ctx.service.repository();
    let (header, lines) = create_command("ATOM-3", vec![line("SKU1", 5, 1)]).to_models(ctx.now());

    let handle = tokio::spawn(async move {
        coordinator
            .run_atomic(move |txn| {
                Box::pin(async move {
                    repo.create(txn, &header, &lines).await?;
                    if header.order_no == "ATOM-3" {
                        panic!("boom after header and lines were written");
                    }
                    Ok(())
                })
            })
            .await
    });

    let join_err = handle.await.unwrap_err();
    assert!(join_err.is_panic());

    assert_matches!(
        ctx.service.get("ATOM-3").await,
        Err(ServiceError::NotFound(_))
    );
    // The connection is usable again afterwards.
    ctx.service
        .create(create_command("ATOM-3", vec![line("SKU1", 5, 1)]))
        .await
        .unwrap();
}

#[tokio::test]
async fn nested_run_atomic_is_rejected() {
    let ctx = TestContext::new().await;
    let outer = ctx.service.coordinator().clone();
    let inner = outer.clone();

    let result: Result<(), ServiceError> = outer
        .run_atomic(move |_txn| {
            Box::pin(async move {
                inner
                    .run_atomic(|_txn| Box::pin(async { Ok(()) }))
                    .await
            })
        })
        .await;

    let err = result.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);
    assert_eq!(
        err.to_string(),
        "Internal error: nested transactions are not supported"
    );
}

#[tokio::test]
async fn committed_work_is_visible_afterwards() {
    let ctx = TestContext::new().await;
    let coordinator = ctx.service.coordinator().clone();
    let repo = ctx.service.repository();
    let (header, lines) = create_command("ATOM-4", vec![line("SKU1", 5, 1)]).to_models(ctx.now());

    let count = coordinator
        .run_atomic(move |txn| {
            Box::pin(async move {
                repo.create(txn, &header, &lines).await?;
                Ok(repo.find_lines(txn, &header.order_no).await?.len())
            })
        })
        .await
        .unwrap();
    assert_eq!(count, 1);
    assert_eq!(ctx.service.get("ATOM-4").await.unwrap().lines.len(), 1);
}
