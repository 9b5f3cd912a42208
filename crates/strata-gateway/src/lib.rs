//! S3 bucket gateway for Strata.
//!
//! Maps bucket names to (repository, commit) pairs and answers a subset of
//! the S3 object API against them. Input buckets are read-only views of
//! closed commits; the single output bucket writes into an open commit.
//! Reads only ever see finalized layers, and every object is served with an
//! index resolved over the merged view.

pub mod bucket;
pub mod config;
pub mod driver;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;

pub use bucket::{resolve_buckets, Bucket, BucketRole};
pub use config::{BucketConfig, GatewayConfig};
pub use driver::{ObjectInfo, WorkerDriver};
pub use error::{GatewayError, GatewayResult};
pub use server::GatewayServer;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request, StatusCode};
    use axum::Router;
    use tower::util::ServiceExt;
    use strata_commits::CommitService;

    fn app() -> Router {
        let (_, driver) = driver::tests::worker_fixture();
        router::build_router(driver)
    }

    fn request(method: Method, uri: &str, body: Body) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(body)
            .unwrap()
    }

    async fn body_string(response: axum::response::Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn health_endpoint() {
        let response = app()
            .oneshot(request(Method::GET, "/health", Body::empty()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn list_buckets_xml() {
        let response = app()
            .oneshot(request(Method::GET, "/", Body::empty()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_string(response).await;
        for name in ["in1", "in2", "out"] {
            assert!(body.contains(&format!("<Name>{name}</Name>")));
        }
        assert!(!body.contains("unmapped"));
    }

    #[tokio::test]
    async fn get_and_head_object() {
        let app = app();
        let response = app
            .clone()
            .oneshot(request(Method::GET, "/in1/file", Body::empty()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["content-type"],
            "text/plain; charset=utf-8"
        );
        assert_eq!(body_string(response).await, "foo");

        let response = app
            .oneshot(request(Method::HEAD, "/in1/file", Body::empty()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-length"], "3");
        assert!(response.headers().contains_key("etag"));
    }

    #[tokio::test]
    async fn missing_key_is_s3_error() {
        let response = app()
            .oneshot(request(Method::GET, "/out/file", Body::empty()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(body_string(response).await.contains("<Code>NoSuchKey</Code>"));
    }

    #[tokio::test]
    async fn put_object_reports_bytes() {
        let app = app();
        let response = app
            .clone()
            .oneshot(request(Method::PUT, "/out/dir/file", Body::from("content1")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-strata-bytes-written"], "8");

        let response = app
            .clone()
            .oneshot(request(Method::PUT, "/in1/file", Body::from("content1")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);

        let response = app
            .oneshot(request(Method::PUT, "/foobar/file", Body::from("content1")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(body_string(response).await.contains("NoSuchBucket"));
    }

    #[tokio::test]
    async fn large_object_round_trip_after_finish() {
        let (svc, driver) = driver::tests::worker_fixture();
        let out = driver.bucket("out").unwrap().clone();
        let app = router::build_router(driver);
        let data: Vec<u8> = (0..20u32 << 20)
            .map(|i| (i.wrapping_mul(2654435761) >> 24) as u8)
            .collect();

        let response = app
            .clone()
            .oneshot(request(Method::PUT, "/out/big", Body::from(data.clone())))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        tokio::task::spawn_blocking(move || {
            svc.finish_commit(&out.repo, out.commit, &strata_fileset::CancellationToken::new())
        })
        .await
        .unwrap()
        .unwrap();

        let response = app
            .oneshot(request(Method::GET, "/out/big", Body::empty()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-length"], data.len().to_string());
        let got = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(got.as_ref() == data.as_slice());
    }

    #[tokio::test]
    async fn delete_object_twice() {
        let app = app();
        for _ in 0..2 {
            let response = app
                .clone()
                .oneshot(request(Method::DELETE, "/out/file", Body::empty()))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::NO_CONTENT);
        }
    }

    #[tokio::test]
    async fn bucket_operations() {
        let app = app();
        let status = |m: Method, uri: &'static str| {
            let app = app.clone();
            async move {
                app.oneshot(request(m, uri, Body::empty()))
                    .await
                    .unwrap()
                    .status()
            }
        };
        assert_eq!(status(Method::HEAD, "/in1").await, StatusCode::OK);
        assert_eq!(status(Method::HEAD, "/foobar").await, StatusCode::NOT_FOUND);
        assert_eq!(status(Method::PUT, "/newbucket").await, StatusCode::NOT_IMPLEMENTED);
        assert_eq!(status(Method::DELETE, "/in1").await, StatusCode::NOT_IMPLEMENTED);
        assert_eq!(status(Method::GET, "/in1").await, StatusCode::NOT_IMPLEMENTED);
    }
}
