//! End-to-end tests for association count preloading against SQLite.
//!
//! Fixtures:
//! - posts 1..3, comments `{1 -> P1, 2 -> P1 (unapproved), 3 -> P2}`
//! - authors 1..3, books `{1 novel, 2 essay}`, contracts `{A1-B1, A1-B2 (unsigned), A2-B1}`
//! - reviews `{B1 rated 5, B1 rated 2, B2 rated 1}`
//! - tags 1..2, taggings pointing at posts and at one comment

use pretty_assertions::assert_eq;
use serde_json::Value;

use tally::prelude::*;

const FIXTURES: &str = "
    CREATE TABLE posts (id INTEGER PRIMARY KEY, title TEXT NOT NULL, published BOOLEAN NOT NULL);
    CREATE TABLE comments (
        id INTEGER PRIMARY KEY,
        post_id INTEGER REFERENCES posts (id),
        approved BOOLEAN NOT NULL
    );
    CREATE TABLE authors (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
    CREATE TABLE books (id INTEGER PRIMARY KEY, title TEXT NOT NULL, genre TEXT NOT NULL);
    CREATE TABLE contracts (
        id INTEGER PRIMARY KEY,
        author_id INTEGER REFERENCES authors (id),
        book_id INTEGER REFERENCES books (id),
        signed BOOLEAN NOT NULL
    );
    CREATE TABLE reviews (id INTEGER PRIMARY KEY, book_id INTEGER REFERENCES books (id), rating INTEGER NOT NULL);
    CREATE TABLE tags (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
    CREATE TABLE taggings (
        id INTEGER PRIMARY KEY,
        tag_id INTEGER REFERENCES tags (id),
        taggable_id INTEGER NOT NULL,
        taggable_type TEXT NOT NULL
    );

    INSERT INTO posts VALUES (1, 'Hello', 1), (2, 'Again', 1), (3, 'Draft', 0);
    INSERT INTO comments VALUES (1, 1, 1), (2, 1, 0), (3, 2, 1);
    INSERT INTO authors VALUES (1, 'Le Guin'), (2, 'Borges'), (3, 'Nobody');
    INSERT INTO books VALUES (1, 'The Dispossessed', 'novel'), (2, 'Other Inquisitions', 'essay');
    INSERT INTO contracts VALUES (1, 1, 1, 1), (2, 1, 2, 0), (3, 2, 1, 1);
    INSERT INTO reviews VALUES (1, 1, 5), (2, 1, 2), (3, 2, 1);
    INSERT INTO tags VALUES (1, 'rust'), (2, 'sql');
    INSERT INTO taggings VALUES (1, 1, 1, 'Post'), (2, 1, 2, 'Post'), (3, 1, 1, 'Comment'), (4, 2, 3, 'Post');
";

fn schema() -> Schema {
    Schema::new()
        .model(
            ModelSpec::new("Post", "posts")
                .association(AssociationSpec::has_many("comments", "Comment", "post_id"))
                .association(
                    AssociationSpec::has_many("approved_comments", "Comment", "post_id")
                        .r#where(Filter::equals("comments.approved", true)),
                )
                .association(AssociationSpec::has_many("taggings", "Tagging", "taggable_id").as_polymorphic("taggable_type")),
        )
        .model(ModelSpec::new("Comment", "comments").association(AssociationSpec::belongs_to("post", "Post", "post_id")))
        .model(
            ModelSpec::new("Author", "authors")
                .association(AssociationSpec::has_many("contracts", "Contract", "author_id"))
                .association(AssociationSpec::has_many_through("books", "contracts")),
        )
        .model(
            ModelSpec::new("Contract", "contracts")
                .association(AssociationSpec::belongs_to("book", "Book", "book_id"))
                .association(AssociationSpec::belongs_to("author", "Author", "author_id")),
        )
        .model(ModelSpec::new("Book", "books").association(AssociationSpec::has_many("reviews", "Review", "book_id")))
        .model(ModelSpec::new("Review", "reviews"))
        .model(
            ModelSpec::new("Tag", "tags")
                .association(AssociationSpec::has_many("taggings", "Tagging", "tag_id"))
                .association(
                    AssociationSpec::has_many_through("posts", "taggings")
                        .source("taggable")
                        .source_type("Post"),
                ),
        )
        .model(
            ModelSpec::new("Tagging", "taggings")
                .association(AssociationSpec::belongs_to("tag", "Tag", "tag_id"))
                .association(AssociationSpec::belongs_to_polymorphic("taggable", "taggable_id", "taggable_type")),
        )
}

async fn builder() -> QueryBuilder<SqliteEngine> {
    let engine = SqliteEngine::memory().await.unwrap();
    engine.execute_batch(FIXTURES).await.unwrap();
    QueryBuilder::new(engine, schema())
}

fn find_all(builder: &QueryBuilder<SqliteEngine>, model: &str) -> FindManyOperation<SqliteEngine> {
    let table = builder.schema().get_model(model).unwrap().table.clone();
    builder.find_many(model).unwrap().order_by(OrderByField::asc(format!("{table}.id")))
}

fn counts(records: &[Record], name: &str) -> Vec<Option<u64>> {
    records.iter().map(|record| record.count(name)).collect()
}

fn id(record: &Record) -> i64 {
    record.get("id").and_then(Value::as_i64).unwrap()
}

#[tokio::test]
async fn test_direct_counts_match_count_queries() {
    let builder = builder().await;
    let posts = find_all(&builder, "Post").include_count("comments").exec().await.unwrap();

    assert_eq!(counts(&posts, "comments_count"), vec![Some(2), Some(1), Some(0)]);
    for post in &posts {
        let direct = builder
            .count("Comment")
            .unwrap()
            .r#where(Filter::equals("comments.post_id", id(post)))
            .exec()
            .await
            .unwrap();
        assert_eq!(post.count("comments_count"), Some(direct), "post {}", id(post));
    }
}

#[tokio::test]
async fn test_counts_accumulate_across_disjoint_passes() {
    let builder = builder().await;
    let mut posts = find_all(&builder, "Post").exec().await.unwrap();

    for approved in [true, false] {
        let options = CountOptions::new().r#where(Filter::equals("comments.approved", approved));
        builder.preload_counts(&mut posts, "comments", &options).await.unwrap();
    }

    assert_eq!(counts(&posts, "comments_count"), vec![Some(2), Some(1), Some(0)]);
}

#[tokio::test]
async fn test_through_counts_books_per_author() {
    let builder = builder().await;
    let authors = find_all(&builder, "Author").include_count("books").exec().await.unwrap();

    assert_eq!(counts(&authors, "books_count"), vec![Some(2), Some(1), Some(0)]);
}

#[tokio::test]
async fn test_through_conditions_reach_the_source() {
    let builder = builder().await;
    let novels = CountOptions::new().count_name("novels").r#where(Filter::equals("books.genre", "novel"));
    let authors = find_all(&builder, "Author")
        .include_count_with("books", novels)
        .exec()
        .await
        .unwrap();

    assert_eq!(counts(&authors, "novels"), vec![Some(1), Some(1), Some(0)]);
    assert_eq!(counts(&authors, "books_count"), vec![None, None, None]);
}

#[tokio::test]
async fn test_through_counts_with_caller_include() {
    let builder = builder().await;
    let well_reviewed = CountOptions::new()
        .count_name("well_reviewed_books")
        .r#where(Filter::Gt("reviews.rating".into(), FilterValue::Int(3)))
        .include("reviews");
    let authors = find_all(&builder, "Author")
        .include_count_with("books", well_reviewed)
        .exec()
        .await
        .unwrap();

    assert_eq!(counts(&authors, "well_reviewed_books"), vec![Some(1), Some(1), Some(0)]);
}

#[tokio::test]
async fn test_through_counts_with_caller_order() {
    let builder = builder().await;
    let ordered = CountOptions::new().order_by(OrderByField::asc("books.id"));
    let authors = find_all(&builder, "Author")
        .include_count_with("books", ordered)
        .exec()
        .await
        .unwrap();

    assert_eq!(counts(&authors, "books_count"), vec![Some(2), Some(1), Some(0)]);
}

#[tokio::test]
async fn test_through_options_filter_intermediates() {
    let builder = builder().await;
    let signed_only = CountOptions::new()
        .count_name("signed_books")
        .through("contracts", PreloadOptions::new().r#where(Filter::equals("contracts.signed", true)));
    let authors = find_all(&builder, "Author")
        .include_count_with("books", signed_only)
        .exec()
        .await
        .unwrap();

    assert_eq!(counts(&authors, "signed_books"), vec![Some(1), Some(1), Some(0)]);
}

#[tokio::test]
async fn test_custom_count_name_matches_default() {
    let builder = builder().await;
    let posts = find_all(&builder, "Post")
        .include_count("comments")
        .include_count_with("comments", CountOptions::new().count_name("num_comments"))
        .exec()
        .await
        .unwrap();

    assert_eq!(counts(&posts, "num_comments"), counts(&posts, "comments_count"));
}

#[tokio::test]
async fn test_association_conditions_apply() {
    let builder = builder().await;
    let posts = find_all(&builder, "Post").include_count("approved_comments").exec().await.unwrap();

    assert_eq!(counts(&posts, "approved_comments_count"), vec![Some(1), Some(1), Some(0)]);
}

#[tokio::test]
async fn test_include_joins_for_conditions() {
    let builder = builder().await;
    let options = CountOptions::new()
        .count_name("published_comments")
        .r#where(Filter::equals("posts.published", true))
        .include("post");
    let posts = find_all(&builder, "Post")
        .include_count_with("comments", options)
        .exec()
        .await
        .unwrap();

    assert_eq!(counts(&posts, "published_comments"), vec![Some(2), Some(1), Some(0)]);
}

#[tokio::test]
async fn test_polymorphic_as_counts_only_matching_type() {
    let builder = builder().await;
    let posts = find_all(&builder, "Post").include_count("taggings").exec().await.unwrap();

    // Tagging 3 shares taggable_id 1 with post 1 but points at a comment.
    assert_eq!(counts(&posts, "taggings_count"), vec![Some(1), Some(1), Some(1)]);
}

#[tokio::test]
async fn test_polymorphic_source_type_through() {
    let builder = builder().await;
    let tags = find_all(&builder, "Tag").include_count("posts").exec().await.unwrap();

    assert_eq!(counts(&tags, "posts_count"), vec![Some(2), Some(1)]);
    assert!(!tags[0].is_loaded("taggings"));
}

#[tokio::test]
async fn test_batched_keys_give_the_same_counts() {
    let builder = builder().await.with_config(PreloadConfig::new().max_in_clause_len(1));
    let posts = find_all(&builder, "Post").include_count("comments").exec().await.unwrap();
    let authors = find_all(&builder, "Author").include_count("books").exec().await.unwrap();

    assert_eq!(counts(&posts, "comments_count"), vec![Some(2), Some(1), Some(0)]);
    assert_eq!(counts(&authors, "books_count"), vec![Some(2), Some(1), Some(0)]);
}

#[tokio::test]
async fn test_empty_name_and_clone_independence() {
    let builder = builder().await;
    let base = find_all(&builder, "Post");

    assert!(base.include_count("").count_requests().is_empty());

    let first = base.include_count("comments");
    let second = first.include_count("approved_comments");
    assert_eq!(first.count_requests().len(), 1);
    assert_eq!(second.count_requests().len(), 2);

    let posts = first.exec().await.unwrap();
    assert_eq!(posts[0].count("approved_comments_count"), None);
}

#[tokio::test]
async fn test_unsupported_kind_is_rejected() {
    let builder = builder().await;
    let err = find_all(&builder, "Comment").include_count("post").exec().await.unwrap_err();

    assert_eq!(err.code, ErrorCode::UnsupportedAssociation);
    assert!(err.message.contains("belongs_to"), "{}", err.message);
}

#[tokio::test]
async fn test_unknown_association_is_rejected() {
    let builder = builder().await;
    let err = find_all(&builder, "Post").include_count("likes").exec().await.unwrap_err();

    assert_eq!(err.code, ErrorCode::InvalidSelect);
}
