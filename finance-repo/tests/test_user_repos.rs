mod utils;

use finance_repo::user_repo::{User, UserRepoError};
use rstest::rstest;
use utils::RepoType;
use uuid::Uuid;

fn new_user() -> User {
    User::new(
        format!("test-user-{}@example.com", Uuid::new_v4()),
        "Test User".to_owned(),
        "not a real hash".to_owned(),
    )
}

#[rstest]
#[case::sqlx(RepoType::SQLx)]
#[case::mem(RepoType::Mem)]
#[actix_rt::test]
async fn test_create_and_get_user(#[case] repo_type: RepoType) {
    let Some((user_repo, _asset_repo)) = utils::build_repos(repo_type).await else {
        return;
    };

    let user = new_user();
    user_repo.create_user(user.clone()).await.unwrap();

    let inserted_user = user_repo.get_user(&user.id).await.unwrap();

    assert_eq!(user, inserted_user);
    assert_eq!(None, inserted_user.access_token);

    user_repo.delete_user(&user.id).await.unwrap();
}

#[rstest]
#[case::sqlx(RepoType::SQLx)]
#[case::mem(RepoType::Mem)]
#[actix_rt::test]
async fn test_create_existing_user(#[case] repo_type: RepoType) {
    let Some((user_repo, _asset_repo)) = utils::build_repos(repo_type).await else {
        return;
    };

    let user = new_user();
    user_repo.create_user(user.clone()).await.unwrap();

    let create_result = user_repo.create_user(user.clone()).await;
    assert!(matches!(
        create_result,
        Err(UserRepoError::UserAlreadyExists(ref id)) if id == &user.id
    ));

    user_repo.delete_user(&user.id).await.unwrap();
}

#[rstest]
#[case::sqlx(RepoType::SQLx)]
#[case::mem(RepoType::Mem)]
#[actix_rt::test]
async fn test_get_invalid_user(#[case] repo_type: RepoType) {
    let Some((user_repo, _asset_repo)) = utils::build_repos(repo_type).await else {
        return;
    };

    let get_result = user_repo.get_user("nobody@example.com").await;
    assert!(matches!(get_result, Err(UserRepoError::UserNotFound(_))));
}

#[rstest]
#[case::sqlx(RepoType::SQLx)]
#[case::mem(RepoType::Mem)]
#[actix_rt::test]
async fn test_set_access_token(#[case] repo_type: RepoType) {
    let Some((user_repo, _asset_repo)) = utils::build_repos(repo_type).await else {
        return;
    };

    let user = new_user();
    user_repo.create_user(user.clone()).await.unwrap();

    user_repo
        .set_access_token(&user.id, "access-sandbox-1234")
        .await
        .unwrap();

    let stored_user = user_repo.get_user(&user.id).await.unwrap();
    assert_eq!(user.password_hash, stored_user.password_hash);
    assert_eq!(
        Some("access-sandbox-1234".to_owned()),
        stored_user.access_token
    );

    user_repo.delete_user(&user.id).await.unwrap();
}

#[rstest]
#[case::sqlx(RepoType::SQLx)]
#[case::mem(RepoType::Mem)]
#[actix_rt::test]
async fn test_set_access_token_invalid_user(#[case] repo_type: RepoType) {
    let Some((user_repo, _asset_repo)) = utils::build_repos(repo_type).await else {
        return;
    };

    let update_result = user_repo
        .set_access_token("nobody@example.com", "access-sandbox-1234")
        .await;
    assert!(matches!(update_result, Err(UserRepoError::UserNotFound(_))));
}

#[rstest]
#[case::sqlx(RepoType::SQLx)]
#[case::mem(RepoType::Mem)]
#[actix_rt::test]
async fn test_delete_user(#[case] repo_type: RepoType) {
    let Some((user_repo, _asset_repo)) = utils::build_repos(repo_type).await else {
        return;
    };

    let user = new_user();
    user_repo.create_user(user.clone()).await.unwrap();

    let delete_result = user_repo.delete_user(&user.id).await;
    assert!(delete_result.is_ok());

    let get_result = user_repo.get_user(&user.id).await;
    assert!(get_result.is_err());
}

#[rstest]
#[case::sqlx(RepoType::SQLx)]
#[case::mem(RepoType::Mem)]
#[actix_rt::test]
async fn test_delete_invalid_user(#[case] repo_type: RepoType) {
    let Some((user_repo, _asset_repo)) = utils::build_repos(repo_type).await else {
        return;
    };

    let delete_result = user_repo.delete_user("nobody@example.com").await;
    assert!(matches!(delete_result, Err(UserRepoError::UserNotFound(_))));
}
