use anyhow::Result;
use onedrive_storage::onedrive_service::onedrive_client::OneDriveClientTrait;
use onedrive_storage::onedrive_service::onedrive_models::{ItemUpdate, UploadOptions};
use crate::common::mock_onedrive_client::{MockOneDriveClient, ROOT_ID};

#[tokio::test]
async fn test_mock_tree_operations() -> Result<()> {
    let mock_client = MockOneDriveClient::new();

    let root = mock_client.fetch_root().await?;
    assert_eq!(root.id, ROOT_ID);
    assert!(root.is_folder());

    let folder = mock_client.create_folder("Docs", ROOT_ID).await?;
    let file = mock_client
        .create_file("a.txt", b"hello".to_vec(), &folder.id, UploadOptions::default())
        .await?;
    assert_eq!(file.size, Some(5));

    let children = mock_client.fetch_objects(&folder.id).await?;
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].name(), "a.txt");

    // Uploading the same name replaces the content in place
    let replaced = mock_client
        .create_file("a.txt", b"hi".to_vec(), &folder.id, UploadOptions::default())
        .await?;
    assert_eq!(replaced.id, file.id);
    assert_eq!(mock_client.fetch_content(&file.id).await?, b"hi");

    let renamed = mock_client
        .update_object(&file.id, &ItemUpdate::rename("b.txt"))
        .await?;
    assert_eq!(renamed.name(), "b.txt");

    mock_client.delete_object(&folder.id).await?;
    assert!(mock_client.item(&file.id).is_none());

    Ok(())
}

#[tokio::test]
async fn test_mock_failures_and_counters() -> Result<()> {
    let mock_client = MockOneDriveClient::new();
    mock_client.make_operation_fail("create_folder");

    let result = mock_client.create_folder("Docs", ROOT_ID).await;
    assert!(result.unwrap_err().to_string().contains("Mock create folder failure"));
    assert_eq!(mock_client.get_call_count("create_folder"), 1);

    mock_client.clear_operation_failures();
    mock_client.create_folder("Docs", ROOT_ID).await?;
    assert!(mock_client.create_folder("Docs", ROOT_ID).await.is_err());
    assert_eq!(mock_client.get_call_count("create_folder"), 3);

    Ok(())
}
