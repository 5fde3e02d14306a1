#![cfg(feature = "integration-tests")]

use common::domain::{
    CreateDeviceRepoInput, Device, DeviceRepository, DeviceState, DomainError,
};
use common::postgres::{PostgresClient, PostgresDeviceRepository};
use goose::MigrationRunner;
use std::sync::Arc;
use testcontainers::runners::AsyncRunner;
use testcontainers::ContainerAsync;
use testcontainers_modules::postgres::Postgres;

async fn setup_test_db() -> (ContainerAsync<Postgres>, PostgresDeviceRepository, PostgresClient) {
    let postgres = Postgres::default().start().await.unwrap();
    let host = postgres.get_host().await.unwrap();
    let port = postgres.get_host_port_ipv4(5432).await.unwrap();

    let migrations_dir = format!("{}/migrations/postgres", env!("CARGO_MANIFEST_DIR"));
    let dsn = format!(
        "postgres://postgres:postgres@{}:{}/postgres?sslmode=disable",
        host, port
    );
    let goose_path = which::which("goose").expect("goose binary not found");

    MigrationRunner::new(
        goose_path.to_string_lossy().to_string(),
        migrations_dir,
        "postgres".to_string(),
        dsn,
    )
    .run_migrations()
    .await
    .expect("Migrations failed");

    let client = PostgresClient::new(
        &host.to_string(),
        port,
        "postgres",
        "postgres",
        "postgres",
        5,
    )
    .expect("Failed to create client");

    let repo = PostgresDeviceRepository::new(client.clone());
    (postgres, repo, client)
}

fn input(name: &str, brand: &str, state: DeviceState) -> CreateDeviceRepoInput {
    CreateDeviceRepoInput {
        name: name.to_string(),
        brand: brand.to_string(),
        state,
    }
}

fn ids(devices: &[Device]) -> Vec<i64> {
    let mut ids: Vec<i64> = devices.iter().map(|d| d.id).collect();
    ids.sort();
    ids
}

#[tokio::test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
async fn test_create_and_get_device() {
    let (_container, repo, _client) = setup_test_db().await;

    let created = repo
        .create_device(input("TestDeviceOne", "BrandOne", DeviceState::Available))
        .await
        .unwrap();

    assert!(created.id > 0);
    assert!(created.created_on.is_some());

    let fetched = repo.get_device(created.id).await.unwrap().unwrap();
    assert_eq!(fetched, created);

    assert!(repo.get_device(created.id + 1000).await.unwrap().is_none());
}

#[tokio::test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
async fn test_empty_name_rejected_by_store() {
    let (_container, repo, _client) = setup_test_db().await;

    let result = repo
        .create_device(input("", "BrandOne", DeviceState::Available))
        .await;

    assert!(matches!(result, Err(DomainError::RepositoryError(_))));
}

#[tokio::test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
async fn test_registry_lifecycle() {
    let (_container, repo, _client) = setup_test_db().await;

    let device_a = repo
        .create_device(input("TestDeviceOne", "BrandOne", DeviceState::Available))
        .await
        .unwrap();
    let device_b = repo
        .create_device(input("TestDeviceTwo", "BrandOne", DeviceState::InUse))
        .await
        .unwrap();

    let updated = repo
        .update_device(Device {
            id: device_a.id,
            name: "X".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(updated.name, "X");
    assert_eq!(updated.brand, "BrandOne");
    assert_eq!(updated.created_on, device_a.created_on);

    let result = repo
        .update_device(Device {
            id: device_b.id,
            name: "Y".to_string(),
            ..Default::default()
        })
        .await;
    assert!(matches!(result, Err(DomainError::DeviceConflict(_))));
    let stored_b = repo.get_device(device_b.id).await.unwrap().unwrap();
    assert_eq!(stored_b.name, "TestDeviceTwo");

    repo.delete_device(device_a.id).await.unwrap();
    assert!(repo.get_device(device_a.id).await.unwrap().is_none());

    let result = repo.delete_device(device_b.id).await;
    assert!(matches!(result, Err(DomainError::DeviceConflict(_))));
    assert!(repo.get_device(device_b.id).await.unwrap().is_some());
}

#[tokio::test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
async fn test_update_and_delete_missing_device() {
    let (_container, repo, _client) = setup_test_db().await;

    let result = repo
        .update_device(Device {
            id: 4242,
            name: "ghost".to_string(),
            ..Default::default()
        })
        .await;
    assert!(matches!(result, Err(DomainError::DeviceNotFound(4242))));

    let result = repo.delete_device(4242).await;
    assert!(matches!(result, Err(DomainError::DeviceNotFound(4242))));
}

#[tokio::test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
async fn test_list_devices_ordered_by_creation() {
    let (_container, repo, _client) = setup_test_db().await;

    assert!(repo.list_devices().await.unwrap().is_empty());

    let first = repo
        .create_device(input("first", "BrandOne", DeviceState::Available))
        .await
        .unwrap();
    let second = repo
        .create_device(input("second", "BrandTwo", DeviceState::Inactive))
        .await
        .unwrap();

    let devices = repo.list_devices().await.unwrap();
    let listed: Vec<i64> = devices.iter().map(|d| d.id).collect();
    assert_eq!(listed, vec![first.id, second.id]);
}

#[tokio::test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
async fn test_filter_by_brand_and_state() {
    let (_container, repo, _client) = setup_test_db().await;

    let a = repo
        .create_device(input("a", "BrandOne", DeviceState::Available))
        .await
        .unwrap();
    let b = repo
        .create_device(input("b", "BrandOne", DeviceState::InUse))
        .await
        .unwrap();
    let c = repo
        .create_device(input("c", "BrandTwo", DeviceState::Inactive))
        .await
        .unwrap();

    let by_brand = repo
        .list_devices_by_brand(vec!["BrandTwo".to_string()])
        .await
        .unwrap();
    assert_eq!(ids(&by_brand), vec![c.id]);

    let by_brand = repo
        .list_devices_by_brand(vec!["BrandOne".to_string(), "BrandTwo".to_string()])
        .await
        .unwrap();
    assert_eq!(ids(&by_brand), vec![a.id, b.id, c.id]);

    let by_state = repo
        .list_devices_by_state(vec![DeviceState::InUse, DeviceState::Available])
        .await
        .unwrap();
    assert_eq!(ids(&by_state), vec![a.id, b.id]);

    let hostile = repo
        .list_devices_by_brand(vec!["x') OR 1=1; --".to_string()])
        .await
        .unwrap();
    assert!(hostile.is_empty());
}

#[tokio::test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
async fn test_empty_filter_rejected() {
    let (_container, repo, _client) = setup_test_db().await;

    match repo.list_devices_by_brand(vec![]).await {
        Err(DomainError::ValidationError(msg)) => assert_eq!(msg, "no value defined"),
        other => panic!("expected ValidationError, got {:?}", other),
    }
}

#[tokio::test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
async fn test_concurrent_update_and_delete_are_serialized() {
    let (_container, repo, _client) = setup_test_db().await;
    let repo = Arc::new(repo);

    let device = repo
        .create_device(input("racer", "BrandOne", DeviceState::Available))
        .await
        .unwrap();

    let updater = {
        let repo = Arc::clone(&repo);
        tokio::spawn(async move {
            repo.update_device(Device {
                id: device.id,
                state: Some(DeviceState::InUse),
                ..Default::default()
            })
            .await
        })
    };
    let deleter = {
        let repo = Arc::clone(&repo);
        tokio::spawn(async move { repo.delete_device(device.id).await })
    };

    let updated = updater.await.unwrap();
    let deleted = deleter.await.unwrap();

    match (updated, deleted) {
        (Ok(_), Err(DomainError::DeviceConflict(_))) => {
            let stored = repo.get_device(device.id).await.unwrap().unwrap();
            assert_eq!(stored.state, Some(DeviceState::InUse));
        }
        (Err(DomainError::DeviceNotFound(_)), Ok(())) => {
            assert!(repo.get_device(device.id).await.unwrap().is_none());
        }
        other => panic!("unexpected interleaving: {:?}", other),
    }
}

#[tokio::test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
async fn test_close_rejects_further_calls() {
    let (_container, repo, client) = setup_test_db().await;

    client.ping().await.unwrap();
    repo.close();

    assert!(client.is_closed());
    assert!(matches!(
        repo.list_devices().await,
        Err(DomainError::RepositoryError(_))
    ));
}
