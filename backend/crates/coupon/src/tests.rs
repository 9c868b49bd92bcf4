//! Unit tests for coupon crate

#[cfg(test)]
mod support {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::{DateTime, Utc};
    use kernel::id::CouponId;

    use crate::application::config::CouponConfig;
    use crate::application::define_coupon::{DefineCouponInput, DefineCouponUseCase};
    use crate::domain::entities::{Coupon, UsageRecord};
    use crate::domain::repository::{
        CouponRepository, CouponTransaction, CouponUnitOfWork, UsageLedger,
    };
    use crate::domain::value_objects::{CouponCode, CouponLimits, ReferenceZone, UserId};
    use crate::error::{CouponError, CouponResult};
    use crate::infra::memory::{InMemoryCouponStore, InMemoryCouponTransaction};

    /// Ledger that answers `count` from a script and records how often it was asked
    pub struct CountingLedger {
        answers: Vec<i64>,
        calls: AtomicUsize,
    }

    impl CountingLedger {
        pub fn answering(answers: &[i64]) -> Self {
            Self {
                answers: answers.to_vec(),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl UsageLedger for CountingLedger {
        async fn count(
            &self,
            _user_id: UserId,
            _coupon_id: CouponId,
            _since: Option<DateTime<Utc>>,
        ) -> CouponResult<i64> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            self.answers
                .get(call)
                .copied()
                .ok_or_else(|| CouponError::Internal(format!("unexpected count call #{call}")))
        }

        async fn insert(
            &self,
            _user_id: UserId,
            _coupon: &Coupon,
            _usage_date: DateTime<Utc>,
        ) -> CouponResult<UsageRecord> {
            Err(CouponError::Internal("insert is not scripted".into()))
        }
    }

    /// Store whose transactions fail to record usages
    pub struct FailingInsertStore {
        pub inner: InMemoryCouponStore,
    }

    pub struct FailingInsertTransaction {
        inner: InMemoryCouponTransaction,
    }

    impl CouponUnitOfWork for FailingInsertStore {
        type Transaction = FailingInsertTransaction;

        async fn begin(&self) -> CouponResult<FailingInsertTransaction> {
            Ok(FailingInsertTransaction {
                inner: self.inner.begin().await?,
            })
        }
    }

    impl CouponRepository for FailingInsertTransaction {
        async fn find_by_code(&self, code: &CouponCode) -> CouponResult<Option<Coupon>> {
            self.inner.find_by_code(code).await
        }

        async fn upsert(&self, code: &CouponCode, limits: &CouponLimits) -> CouponResult<Coupon> {
            self.inner.upsert(code, limits).await
        }

        async fn decrement_global_count(
            &self,
            coupon_id: CouponId,
            amount: i32,
        ) -> CouponResult<bool> {
            self.inner.decrement_global_count(coupon_id, amount).await
        }
    }

    impl UsageLedger for FailingInsertTransaction {
        async fn count(
            &self,
            user_id: UserId,
            coupon_id: CouponId,
            since: Option<DateTime<Utc>>,
        ) -> CouponResult<i64> {
            self.inner.count(user_id, coupon_id, since).await
        }

        async fn insert(
            &self,
            _user_id: UserId,
            _coupon: &Coupon,
            _usage_date: DateTime<Utc>,
        ) -> CouponResult<UsageRecord> {
            Err(CouponError::Internal("usage ledger unavailable".into()))
        }
    }

    impl CouponTransaction for FailingInsertTransaction {
        async fn lock_by_code(&self, code: &CouponCode) -> CouponResult<Option<Coupon>> {
            self.inner.lock_by_code(code).await
        }

        async fn commit(self) -> CouponResult<()> {
            self.inner.commit().await
        }
    }

    pub fn utc_config() -> Arc<CouponConfig> {
        Arc::new(CouponConfig::with_reference_zone(ReferenceZone::utc()))
    }

    pub async fn define(
        store: &Arc<InMemoryCouponStore>,
        code: &str,
        limits: [i32; 4],
    ) -> Coupon {
        DefineCouponUseCase::new(store.clone())
            .execute(DefineCouponInput {
                code: code.to_string(),
                global_repeat_count: limits[0],
                user_total_repeat_count: limits[1],
                user_daily_repeat_count: limits[2],
                user_weekly_repeat_count: limits[3],
            })
            .await
            .unwrap()
    }
}

#[cfg(test)]
mod evaluator_tests {
    use super::support::CountingLedger;
    use crate::domain::entities::Coupon;
    use crate::domain::services::EligibilityEvaluator;
    use crate::domain::value_objects::{
        CouponCode, CouponLimits, Eligibility, ReferenceZone, UserId,
    };
    use chrono::Utc;

    fn coupon(limits: [i32; 4]) -> Coupon {
        Coupon::new(
            CouponCode::new("A10").unwrap(),
            CouponLimits::new(limits[0], limits[1], limits[2], limits[3]).unwrap(),
        )
    }

    async fn evaluate(coupon: &Coupon, ledger: &CountingLedger) -> Eligibility {
        EligibilityEvaluator::new(ReferenceZone::utc())
            .evaluate(ledger, coupon, UserId::new(1), Utc::now())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_exhausted_global_skips_ledger() {
        let ledger = CountingLedger::answering(&[]);
        let result = evaluate(&coupon([0, 5, 5, 5]), &ledger).await;
        assert_eq!(result, Eligibility::GlobalExhausted);
        assert_eq!(ledger.calls(), 0);
    }

    #[tokio::test]
    async fn test_total_limit_stops_after_one_call() {
        let ledger = CountingLedger::answering(&[5]);
        let result = evaluate(&coupon([10, 5, 5, 5]), &ledger).await;
        assert_eq!(result, Eligibility::UserTotalReached);
        assert_eq!(ledger.calls(), 1);
    }

    #[tokio::test]
    async fn test_daily_limit_stops_after_two_calls() {
        let ledger = CountingLedger::answering(&[2, 2]);
        let result = evaluate(&coupon([10, 5, 2, 5]), &ledger).await;
        assert_eq!(result, Eligibility::UserDailyReached);
        assert_eq!(ledger.calls(), 2);
    }

    #[tokio::test]
    async fn test_weekly_limit_stops_after_three_calls() {
        let ledger = CountingLedger::answering(&[3, 0, 3]);
        let result = evaluate(&coupon([10, 5, 2, 3]), &ledger).await;
        assert_eq!(result, Eligibility::UserWeeklyReached);
        assert_eq!(ledger.calls(), 3);
    }

    #[tokio::test]
    async fn test_all_limits_clear() {
        let ledger = CountingLedger::answering(&[1, 0, 1]);
        let result = evaluate(&coupon([10, 5, 2, 3]), &ledger).await;
        assert_eq!(result, Eligibility::Eligible);
        assert_eq!(ledger.calls(), 3);
    }

    #[tokio::test]
    async fn test_zero_per_user_limit_blocks_everyone() {
        let ledger = CountingLedger::answering(&[0]);
        let result = evaluate(&coupon([10, 0, 5, 5]), &ledger).await;
        assert_eq!(result, Eligibility::UserTotalReached);
    }
}

#[cfg(test)]
mod use_case_tests {
    use std::sync::Arc;

    use chrono::{Duration, Utc};

    use super::support::{FailingInsertStore, define, utc_config};
    use crate::application::apply_coupon::ApplyCouponUseCase;
    use crate::application::define_coupon::{DefineCouponInput, DefineCouponUseCase};
    use crate::application::verify_coupon::VerifyCouponUseCase;
    use crate::domain::repository::UsageLedger;
    use crate::domain::services::UsageWindows;
    use crate::domain::value_objects::{ReferenceZone, UserId};
    use crate::error::CouponError;
    use crate::infra::memory::InMemoryCouponStore;

    #[tokio::test]
    async fn test_define_twice_keeps_one_coupon_with_latest_limits() {
        let store = Arc::new(InMemoryCouponStore::new());
        let first = define(&store, "A10", [2, 5, 5, 5]).await;
        let second = define(&store, "A10", [9, 1, 1, 1]).await;

        assert_eq!(first.id, second.id);
        let stored = store.coupon("A10").await.unwrap();
        assert_eq!(stored.limits.global_repeat_count, 9);
        assert_eq!(stored.limits.user_total_repeat_count, 1);
    }

    #[tokio::test]
    async fn test_define_rejects_negative_limits() {
        let store = Arc::new(InMemoryCouponStore::new());
        let result = DefineCouponUseCase::new(store.clone())
            .execute(DefineCouponInput {
                code: "A10".into(),
                global_repeat_count: -1,
                user_total_repeat_count: 1,
                user_daily_repeat_count: 1,
                user_weekly_repeat_count: 1,
            })
            .await;

        assert!(matches!(result, Err(CouponError::InvalidInput(_))));
        assert!(store.coupon("A10").await.is_none());
    }

    #[tokio::test]
    async fn test_apply_decrements_and_records_once() {
        let store = Arc::new(InMemoryCouponStore::new());
        define(&store, "A10", [3, 5, 5, 5]).await;

        let output = ApplyCouponUseCase::new(store.clone(), utc_config())
            .execute("A10", UserId::new(1))
            .await
            .unwrap();

        assert_eq!(output.remaining_global_count, 2);
        assert_eq!(output.usage.user_id, UserId::new(1));
        assert_eq!(store.usage_count().await, 1);
        let stored = store.coupon("A10").await.unwrap();
        assert_eq!(stored.limits.global_repeat_count, 2);
    }

    #[tokio::test]
    async fn test_a10_scenario() {
        let store = Arc::new(InMemoryCouponStore::new());
        define(&store, "A10", [2, 5, 5, 5]).await;
        let user = UserId::new(1);
        let verify = VerifyCouponUseCase::new(store.clone(), utc_config());
        let apply = ApplyCouponUseCase::new(store.clone(), utc_config());

        assert!(verify.execute("A10", user).await.unwrap());

        apply.execute("A10", user).await.unwrap();
        assert_eq!(
            store.coupon("A10").await.unwrap().limits.global_repeat_count,
            1
        );

        apply.execute("A10", user).await.unwrap();
        assert_eq!(
            store.coupon("A10").await.unwrap().limits.global_repeat_count,
            0
        );

        let third = apply.execute("A10", user).await;
        assert!(matches!(third, Err(CouponError::Ineligible)));
        assert!(!verify.execute("A10", user).await.unwrap());
        assert_eq!(store.usage_count().await, 2);
    }

    #[tokio::test]
    async fn test_unknown_code_is_not_found() {
        let store = Arc::new(InMemoryCouponStore::new());
        let user = UserId::new(1);

        let verify = VerifyCouponUseCase::new(store.clone(), utc_config())
            .execute("UNKNOWN", user)
            .await;
        assert!(matches!(verify, Err(CouponError::NotFound)));

        let apply = ApplyCouponUseCase::new(store.clone(), utc_config())
            .execute("UNKNOWN", user)
            .await;
        assert!(matches!(apply, Err(CouponError::NotFound)));

        // A code that could never be defined behaves the same
        let blank = VerifyCouponUseCase::new(store.clone(), utc_config())
            .execute("", user)
            .await;
        assert!(matches!(blank, Err(CouponError::NotFound)));
    }

    #[tokio::test]
    async fn test_code_lookup_is_case_sensitive() {
        let store = Arc::new(InMemoryCouponStore::new());
        define(&store, "A10", [2, 5, 5, 5]).await;

        let result = VerifyCouponUseCase::new(store.clone(), utc_config())
            .execute("a10", UserId::new(1))
            .await;
        assert!(matches!(result, Err(CouponError::NotFound)));
    }

    #[tokio::test]
    async fn test_ineligible_apply_changes_nothing() {
        let store = Arc::new(InMemoryCouponStore::new());
        define(&store, "A10", [5, 1, 5, 5]).await;
        let apply = ApplyCouponUseCase::new(store.clone(), utc_config());

        apply.execute("A10", UserId::new(1)).await.unwrap();
        let second = apply.execute("A10", UserId::new(1)).await;

        assert!(matches!(second, Err(CouponError::Ineligible)));
        assert_eq!(store.usage_count().await, 1);
        let stored = store.coupon("A10").await.unwrap();
        assert_eq!(stored.limits.global_repeat_count, 4);

        // Another user is unaffected by the first user's total
        apply.execute("A10", UserId::new(2)).await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_insert_rolls_back_decrement() {
        let store = Arc::new(InMemoryCouponStore::new());
        define(&store, "A10", [3, 5, 5, 5]).await;
        let failing = Arc::new(FailingInsertStore {
            inner: store.as_ref().clone(),
        });

        let result = ApplyCouponUseCase::new(failing, utc_config())
            .execute("A10", UserId::new(1))
            .await;

        assert!(matches!(result, Err(CouponError::Internal(_))));
        assert_eq!(store.usage_count().await, 0);
        let stored = store.coupon("A10").await.unwrap();
        assert_eq!(stored.limits.global_repeat_count, 3);

        // The store lock was released with the failed transaction
        ApplyCouponUseCase::new(store.clone(), utc_config())
            .execute("A10", UserId::new(1))
            .await
            .unwrap();
        assert_eq!(store.usage_count().await, 1);
    }

    #[tokio::test]
    async fn test_daily_window_ignores_yesterday() {
        let store = Arc::new(InMemoryCouponStore::new());
        let coupon = define(&store, "A10", [10, 10, 1, 10]).await;
        let user = UserId::new(1);
        let verify = VerifyCouponUseCase::new(store.clone(), utc_config());

        let windows = UsageWindows::at(Utc::now(), ReferenceZone::utc());
        let yesterday = windows.day_start - Duration::seconds(1);
        store.insert(user, &coupon, yesterday).await.unwrap();
        assert!(verify.execute("A10", user).await.unwrap());

        store.insert(user, &coupon, Utc::now()).await.unwrap();
        assert!(!verify.execute("A10", user).await.unwrap());
    }

    #[tokio::test]
    async fn test_weekly_window_ignores_last_week() {
        let store = Arc::new(InMemoryCouponStore::new());
        let coupon = define(&store, "A10", [10, 10, 10, 1]).await;
        let user = UserId::new(1);
        let verify = VerifyCouponUseCase::new(store.clone(), utc_config());

        let windows = UsageWindows::at(Utc::now(), ReferenceZone::utc());
        store
            .insert(user, &coupon, windows.week_start - Duration::seconds(1))
            .await
            .unwrap();
        assert!(verify.execute("A10", user).await.unwrap());

        store.insert(user, &coupon, windows.week_start).await.unwrap();
        assert!(!verify.execute("A10", user).await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_apply_takes_last_redemption_once() {
        let store = Arc::new(InMemoryCouponStore::new());
        define(&store, "ONE", [1, 5, 5, 5]).await;
        let apply = Arc::new(ApplyCouponUseCase::new(store.clone(), utc_config()));

        let first = tokio::spawn({
            let apply = apply.clone();
            async move { apply.execute("ONE", UserId::new(1)).await }
        });
        let second = tokio::spawn({
            let apply = apply.clone();
            async move { apply.execute("ONE", UserId::new(2)).await }
        });

        let results = [first.await.unwrap(), second.await.unwrap()];
        let successes = results.iter().filter(|r| r.is_ok()).count();
        let ineligible = results
            .iter()
            .filter(|r| matches!(r, Err(CouponError::Ineligible)))
            .count();

        assert_eq!(successes, 1);
        assert_eq!(ineligible, 1);
        assert_eq!(store.usage_count().await, 1);
        let stored = store.coupon("ONE").await.unwrap();
        assert_eq!(stored.limits.global_repeat_count, 0);
    }
}

#[cfg(test)]
mod error_tests {
    use crate::error::CouponError;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use kernel::error::app_error::AppError;
    use kernel::error::kind::ErrorKind;

    #[test]
    fn test_error_into_response_status_codes() {
        let cases = [
            (CouponError::NotFound, StatusCode::NOT_FOUND),
            (CouponError::Ineligible, StatusCode::BAD_REQUEST),
            (
                CouponError::InvalidInput("bad".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                CouponError::Internal("boom".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.status_code(), expected);
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[test]
    fn test_error_display() {
        assert_eq!(CouponError::NotFound.to_string(), "Coupon not found");
        assert_eq!(
            CouponError::Ineligible.to_string(),
            "Coupon usage limit exceeded"
        );
    }

    #[test]
    fn test_unexpected_errors_use_fallback_message() {
        let err = CouponError::Internal("connection reset by peer".into());
        let app = err.to_app_error("Error applying coupon");
        assert_eq!(app.message(), "Error applying coupon");
        assert_eq!(app.kind(), ErrorKind::InternalServerError);

        let err = CouponError::Ineligible;
        let app = err.to_app_error("Error applying coupon");
        assert_eq!(app.message(), "Coupon usage limit exceeded");
        assert_eq!(app.kind(), ErrorKind::BadRequest);
    }

    #[test]
    fn test_conversion_to_app_error() {
        let app: AppError = CouponError::NotFound.into();
        assert_eq!(app.kind(), ErrorKind::NotFound);
        assert_eq!(app.message(), "Coupon not found");
    }
}

#[cfg(test)]
mod router_tests {
    use axum::Router;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use crate::application::config::CouponConfig;
    use crate::domain::value_objects::ReferenceZone;
    use crate::infra::memory::InMemoryCouponStore;
    use crate::presentation::router::coupon_router_generic;

    fn app() -> Router {
        coupon_router_generic(
            InMemoryCouponStore::new(),
            CouponConfig::with_reference_zone(ReferenceZone::utc()),
        )
    }

    async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
        post_raw(app, uri, body.to_string()).await
    }

    async fn post_raw(app: &Router, uri: &str, body: String) -> (StatusCode, Value) {
        let request = Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn a10() -> Value {
        json!({
            "code": "A10",
            "globalRepeatCount": 2,
            "userTotalRepeatCount": 5,
            "userDailyRepeatCount": 5,
            "userWeeklyRepeatCount": 5
        })
    }

    #[tokio::test]
    async fn test_define_returns_coupon() {
        let app = app();
        let (status, body) = post(&app, "/add-repeat-counts-code", a10()).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["result"]["code"], "A10");
        assert_eq!(body["result"]["globalRepeatCount"], 2);
        assert_eq!(body["result"]["userWeeklyRepeatCount"], 5);
        assert!(body.get("message").is_none());
    }

    #[tokio::test]
    async fn test_full_flow_over_http() {
        let app = app();
        post(&app, "/add-repeat-counts-code", a10()).await;
        let redeem = json!({ "code": "A10", "userId": 1 });

        let (status, body) = post(&app, "/verify-coupon", redeem.clone()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "success": true, "result": { "isValid": true } }));

        for _ in 0..2 {
            let (status, body) = post(&app, "/apply-coupon", redeem.clone()).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(
                body,
                json!({ "success": true, "result": { "message": "Coupon applied Successfully" } })
            );
        }

        let (status, body) = post(&app, "/apply-coupon", redeem.clone()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({ "success": false, "message": "Coupon usage limit exceeded" })
        );

        let (_, body) = post(&app, "/verify-coupon", redeem).await;
        assert_eq!(body["result"]["isValid"], false);
    }

    #[tokio::test]
    async fn test_unknown_coupon_is_404_envelope() {
        let app = app();
        let (status, body) = post(
            &app,
            "/verify-coupon",
            json!({ "code": "UNKNOWN", "userId": "7" }),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "success": false, "message": "Coupon not found" }));
    }

    #[tokio::test]
    async fn test_non_numeric_user_id_is_rejected() {
        let app = app();
        post(&app, "/add-repeat-counts-code", a10()).await;
        let (status, body) = post(
            &app,
            "/apply-coupon",
            json!({ "code": "A10", "userId": "abc" }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "User ID must be an integer");
    }

    #[tokio::test]
    async fn test_negative_limit_is_rejected() {
        let app = app();
        let mut request = a10();
        request["userDailyRepeatCount"] = json!(-1);

        let (status, body) = post(&app, "/add-repeat-counts-code", request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "userDailyRepeatCount must be non-negative");
    }

    #[tokio::test]
    async fn test_malformed_json_gets_envelope() {
        let app = app();
        let (status, body) = post_raw(&app, "/verify-coupon", "{not json".to_string()).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert!(body["message"].is_string());
        assert!(body.get("result").is_none());
    }
}
