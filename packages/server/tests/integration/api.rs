use serde_json::json;

use crate::common::{FALLBACK_URL, GeneratorMode, PNG_BYTES, TestApp, routes};

mod images {
    use super::*;

    #[tokio::test]
    async fn ingredient_image_url_is_served() {
        let app = TestApp::spawn().await;

        let res = app
            .post(
                routes::INGREDIENT_IMAGES,
                &json!({ "label": "Tomate Cherry", "owner_id": "u1" }),
            )
            .await;
        assert_eq!(res.status, 200);
        let url = res.body["url"].as_str().unwrap().to_string();
        assert!(url.contains("/blobs/users/u1/ingredients/"), "{url}");

        let blob = app.get_absolute(&url).await;
        assert_eq!(blob.status, 200);
        assert_eq!(blob.content_type.as_deref(), Some("image/png"));
        assert_eq!(blob.bytes, PNG_BYTES);
    }

    #[tokio::test]
    async fn failing_generator_still_returns_a_url() {
        let app = TestApp::spawn_with(GeneratorMode::Fail).await;

        let res = app
            .post(
                routes::INGREDIENT_IMAGES,
                &json!({ "label": "Ajo", "owner_id": "u1" }),
            )
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["url"], FALLBACK_URL);
    }

    #[tokio::test]
    async fn recipe_urls_are_shared_between_owners() {
        let app = TestApp::spawn().await;

        let a = app
            .post(
                routes::RECIPE_IMAGES,
                &json!({ "title": "Paella Valenciana", "context": "rice, rabbit" }),
            )
            .await;
        let b = app
            .post(routes::RECIPE_IMAGES, &json!({ "title": "PAELLA valenciana" }))
            .await;

        assert_eq!(a.status, 200);
        assert_eq!(a.body["url"], b.body["url"]);
        assert_eq!(app.generator.calls(), 1);
    }

    #[tokio::test]
    async fn malformed_body_is_a_validation_error() {
        let app = TestApp::spawn().await;

        let res = app
            .post(routes::INGREDIENT_IMAGES, &json!({ "label": "Ajo" }))
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }
}

mod upload {
    use super::*;

    #[tokio::test]
    async fn upload_creates_asset() {
        let app = TestApp::spawn().await;

        let res = app
            .upload(
                Some(("photo.png", PNG_BYTES.to_vec())),
                "Tomate Cherry",
                "ingredient",
                Some("u1"),
            )
            .await;

        assert_eq!(res.status, 201);
        assert_eq!(res.body["canonical_name"], "tomate_cherry");
        assert_eq!(res.body["kind"], "ingredient");
        assert!(res.body["id"].as_i64().is_some());

        let url = res.body["public_url"].as_str().unwrap();
        let blob = app.get_absolute(url).await;
        assert_eq!(blob.status, 200);
        assert_eq!(blob.bytes, PNG_BYTES);
    }

    #[tokio::test]
    async fn duplicate_upload_returns_conflict_with_existing_record() {
        let app = TestApp::spawn().await;
        let first = app
            .upload(Some(("a.png", vec![1, 2, 3])), "Tomate", "ingredient", None)
            .await;
        assert_eq!(first.status, 201);

        let res = app
            .upload(Some(("b.jpg", vec![4, 5, 6])), "tomate", "recipe", Some("u2"))
            .await;

        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "CONFLICT");
        assert_eq!(res.body["details"]["id"], first.body["id"]);
        assert_eq!(res.body["details"]["canonical_name"], "tomate");
    }

    #[tokio::test]
    async fn missing_file_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app.upload(None, "Tomate", "ingredient", None).await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn oversized_file_is_rejected_with_structured_error() {
        let app = TestApp::spawn().await;

        let res = app
            .upload(
                Some(("big.png", vec![0u8; 10 * 1024 * 1024 + 1])),
                "Big",
                "ingredient",
                None,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn unknown_kind_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app
            .upload(Some(("a.png", vec![1])), "Tomate", "dessert", None)
            .await;

        assert_eq!(res.status, 400);
    }
}

mod lookup {
    use super::*;

    async fn seed(app: &TestApp) {
        for name in ["Tomate", "Tomate Cherry", "Salsa de Tomate", "Ajo"] {
            let res = app
                .upload(Some(("a.png", vec![1])), name, "ingredient", None)
                .await;
            assert_eq!(res.status, 201, "{name}");
        }
    }

    #[tokio::test]
    async fn search_ranks_exact_then_prefix_then_substring() {
        let app = TestApp::spawn().await;
        seed(&app).await;

        let res = app.get(&format!("{}?q=tomate", routes::ASSETS)).await;

        assert_eq!(res.status, 200);
        let names: Vec<_> = res.body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|a| a["canonical_name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["tomate", "tomate_cherry", "salsa_de_tomate"]);
    }

    #[tokio::test]
    async fn search_without_matches_is_empty() {
        let app = TestApp::spawn().await;
        seed(&app).await;

        let res = app.get(&format!("{}?q=berenjena", routes::ASSETS)).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["data"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn search_requires_a_query() {
        let app = TestApp::spawn().await;

        let res = app.get(routes::ASSETS).await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn get_by_name_normalizes_input() {
        let app = TestApp::spawn().await;
        seed(&app).await;

        let res = app.get(&routes::asset("Tomate%20Cherry")).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["canonical_name"], "tomate_cherry");

        let missing = app.get(&routes::asset("berenjena")).await;
        assert_eq!(missing.status, 404);
        assert_eq!(missing.body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn public_url_can_be_corrected() {
        let app = TestApp::spawn().await;
        seed(&app).await;
        let ajo = app.get(&routes::asset("ajo")).await;
        let id = ajo.body["id"].as_i64().unwrap();

        let res = app
            .patch(
                &routes::asset_url(id),
                &json!({ "public_url": "https://cdn.test/ajo.png" }),
            )
            .await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["public_url"], "https://cdn.test/ajo.png");

        let again = app.get(&routes::asset("ajo")).await;
        assert_eq!(again.body["public_url"], "https://cdn.test/ajo.png");

        let missing = app
            .patch(
                &routes::asset_url(9999),
                &json!({ "public_url": "https://cdn.test/x.png" }),
            )
            .await;
        assert_eq!(missing.status, 404);
    }
}

mod sync {
    use super::*;

    #[tokio::test]
    async fn sync_endpoint_reports_counts() {
        let app = TestApp::spawn().await;
        app.post(
            routes::INGREDIENT_IMAGES,
            &json!({ "label": "Ajo", "owner_id": "u1" }),
        )
        .await;

        let res = app.post_empty(routes::ASSETS_SYNC).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["inserted"], 0);
        assert_eq!(res.body["existing"], 1);
        assert_eq!(res.body["failed"], 0);
    }
}

mod docs {
    use super::*;

    #[tokio::test]
    async fn openapi_document_lists_routes() {
        let app = TestApp::spawn().await;

        let res = app.get("/api-docs/openapi.json").await;

        assert_eq!(res.status, 200);
        assert!(res.body["paths"]["/api/v1/assets/sync"].is_object());
        assert!(res.body["paths"]["/api/v1/images/recipes"].is_object());
    }
}
