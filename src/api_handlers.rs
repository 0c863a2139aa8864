use crate::catalog::{PageRequest, VideoFilter};
use crate::dto::{
    CatalogParams, SearchParams, SettingsEnvelope, SettingsResponse, StreamInfo,
    VideoListResponse, VideoResponse,
};
use crate::error::{ApiError, Context};
use crate::models::SiteSettings;
use crate::store::Store;
use actix_web::http::header::{CACHE_CONTROL, ETAG, IF_NONE_MATCH};
use actix_web::{web, HttpRequest, HttpResponse};
use mongodb::bson::oid::ObjectId;

pub(crate) fn parse_video_id(raw: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(raw).map_err(|_| ApiError::validation("Invalid video ID"))
}

fn list_response(videos: Vec<crate::models::Video>, page: PageRequest, total: u64) -> VideoListResponse {
    VideoListResponse {
        videos: videos.into_iter().map(VideoResponse::from).collect(),
        pagination: page.pagination(total),
    }
}

// GET /api/videos
pub async fn get_videos(
    store: web::Data<dyn Store>,
    params: web::Query<CatalogParams>,
) -> Result<HttpResponse, ApiError> {
    let filter = VideoFilter::from_params(&params).map_err(ApiError::Validation)?;
    let page = PageRequest::parse(&params.page, &params.limit).map_err(ApiError::Validation)?;

    let (videos, total) = store
        .list_videos(&filter, page)
        .await
        .context("Failed to fetch videos")?;
    Ok(HttpResponse::Ok().json(list_response(videos, page, total)))
}

// GET /api/videos/{id}
pub async fn get_video(
    store: web::Data<dyn Store>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = parse_video_id(&path)?;
    let video = store
        .get_video(id)
        .await
        .context("Failed to fetch video")?
        .ok_or_else(|| ApiError::not_found("Video not found"))?;
    Ok(HttpResponse::Ok().json(VideoResponse::from(video)))
}

// GET /api/search?q=
pub async fn search(
    store: web::Data<dyn Store>,
    params: web::Query<SearchParams>,
) -> Result<HttpResponse, ApiError> {
    let query = params.q.as_deref().map(str::trim).unwrap_or_default();
    if query.is_empty() {
        return Err(ApiError::validation("Search query is required"));
    }
    let page = PageRequest::parse(&params.page, &params.limit).map_err(ApiError::Validation)?;

    let (videos, total) = store
        .search_videos(query, page)
        .await
        .context("Search failed")?;
    Ok(HttpResponse::Ok().json(list_response(videos, page, total)))
}

// GET /api/stream/{id}: counts one view per call
pub async fn stream_info(
    store: web::Data<dyn Store>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = parse_video_id(&path)?;
    let video = store
        .record_view(id)
        .await
        .context("Failed to fetch stream info")?
        .ok_or_else(|| ApiError::not_found("Video not found"))?;
    Ok(HttpResponse::Ok().json(StreamInfo::from(video)))
}

pub(crate) fn settings_etag(settings: &SiteSettings) -> String {
    format!("\"settings-v{}\"", settings.version)
}

// GET /api/settings
pub async fn get_settings(
    req: HttpRequest,
    store: web::Data<dyn Store>,
) -> Result<HttpResponse, ApiError> {
    let settings = store
        .load_settings()
        .await
        .context("Failed to fetch settings")?;
    let etag = settings_etag(&settings);

    let not_modified = req
        .headers()
        .get(IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        .map_or(false, |v| v.split(',').any(|tag| tag.trim() == etag));
    if not_modified {
        return Ok(HttpResponse::NotModified()
            .insert_header((ETAG, etag))
            .finish());
    }

    Ok(HttpResponse::Ok()
        .insert_header((ETAG, etag))
        .insert_header((CACHE_CONTROL, "no-cache"))
        .json(SettingsEnvelope {
            settings: SettingsResponse::from(&settings),
            message: None,
        }))
}

#[cfg(test)]
mod tests {
    use crate::test_support::{sample_video, test_app, TestContext};
    use crate::store::Store;
    use actix_web::http::StatusCode;
    use actix_web::test;
    use serde_json::Value;

    #[actix_web::test]
    async fn genre_filter_with_pagination() {
        let ctx = TestContext::new().await;
        ctx.store.insert_video(sample_video("Older", &["Action"])).await.unwrap();
        ctx.store.insert_video(sample_video("Drama Only", &["Drama"])).await.unwrap();
        ctx.store.insert_video(sample_video("Newer", &["Action", "Thriller"])).await.unwrap();
        let app = test_app!(ctx);

        let req = test::TestRequest::get()
            .uri("/api/videos?genre=Action&page=2&limit=1")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["pagination"]["total"], 2);
        assert_eq!(body["pagination"]["pages"], 2);
        assert_eq!(body["pagination"]["page"], 2);
        let videos = body["videos"].as_array().unwrap();
        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0]["title"], "Older");
    }

    #[actix_web::test]
    async fn page_past_the_end_is_empty() {
        let ctx = TestContext::new().await;
        ctx.store.insert_video(sample_video("Only", &["Action"])).await.unwrap();
        let app = test_app!(ctx);

        let req = test::TestRequest::get().uri("/api/videos?page=5").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["videos"].as_array().unwrap().len(), 0);
        assert_eq!(body["pagination"]["total"], 1);
    }

    #[actix_web::test]
    async fn huge_page_number_is_an_empty_page() {
        let ctx = TestContext::new().await;
        ctx.store.insert_video(sample_video("Only", &["Action"])).await.unwrap();
        let app = test_app!(ctx);

        let req = test::TestRequest::get()
            .uri("/api/videos?page=18446744073709551615&limit=20")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["videos"].as_array().unwrap().len(), 0);
        assert_eq!(body["pagination"]["total"], 1);

        let req = test::TestRequest::get()
            .uri("/api/search?q=only&page=18446744073709551615")
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn public_read_returns_the_bare_document() {
        let ctx = TestContext::new().await;
        let video = ctx.store.insert_video(sample_video("Bare", &["Drama"])).await.unwrap();
        let id = video.id.unwrap().to_hex();
        let app = test_app!(ctx);

        let req = test::TestRequest::get()
            .uri(&format!("/api/videos/{}", id))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["_id"], id.as_str());
        assert_eq!(body["title"], "Bare");
        assert!(body.get("video").is_none());
    }

    #[actix_web::test]
    async fn flags_and_year_filter() {
        let ctx = TestContext::new().await;
        let mut trending = sample_video("Hot", &["Action"]);
        trending.is_trending = true;
        trending.year = 2019;
        ctx.store.insert_video(trending).await.unwrap();
        ctx.store.insert_video(sample_video("Cold", &["Action"])).await.unwrap();
        let app = test_app!(ctx);

        let req = test::TestRequest::get()
            .uri("/api/videos?trending=true&year=2019")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let titles: Vec<_> = body["videos"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v["title"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(titles, ["Hot"]);

        let req = test::TestRequest::get().uri("/api/videos?year=soon").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn streaming_twice_adds_two_views() {
        let ctx = TestContext::new().await;
        let video = ctx.store.insert_video(sample_video("Counted", &["Drama"])).await.unwrap();
        let id = video.id.unwrap().to_hex();
        let app = test_app!(ctx);

        for expected in ["Counted", "Counted"] {
            let req = test::TestRequest::get()
                .uri(&format!("/api/stream/{}", id))
                .to_request();
            let body: Value = test::call_and_read_body_json(&app, req).await;
            assert_eq!(body["title"], expected);
            assert_eq!(body["id"], id.as_str());
        }

        let stored = ctx.store.get_video(video.id.unwrap()).await.unwrap().unwrap();
        assert_eq!(stored.views, 2);
    }

    #[actix_web::test]
    async fn unknown_and_malformed_ids() {
        let ctx = TestContext::new().await;
        let app = test_app!(ctx);

        let req = test::TestRequest::get()
            .uri("/api/videos/64b7f0c2a1b2c3d4e5f60718")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Video not found");

        let req = test::TestRequest::get().uri("/api/stream/not-an-id").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn search_requires_query() {
        let ctx = TestContext::new().await;
        ctx.store.insert_video(sample_video("Dream Heist", &["Action"])).await.unwrap();
        ctx.store.insert_video(sample_video("Quiet Town", &["Drama"])).await.unwrap();
        let app = test_app!(ctx);

        let req = test::TestRequest::get().uri("/api/search?q=%20").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Search query is required");

        let req = test::TestRequest::get().uri("/api/search?q=dream").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["pagination"]["total"], 1);
        assert_eq!(body["videos"][0]["title"], "Dream Heist");
    }

    #[actix_web::test]
    async fn settings_are_created_on_first_read_and_revalidated() {
        let ctx = TestContext::new().await;
        let app = test_app!(ctx);

        let req = test::TestRequest::get().uri("/api/settings").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let etag = resp
            .headers()
            .get("etag")
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["settings"]["siteName"], "STREAMME");
        assert_eq!(body["settings"]["adType"], "google");

        let req = test::TestRequest::get()
            .uri("/api/settings")
            .insert_header(("If-None-Match", etag))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_MODIFIED);
    }
}
