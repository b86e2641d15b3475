use chrono::{NaiveDate, NaiveTime};
use mockall::mock;
use uuid::Uuid;

use crate::models::{DbNotification, DbReminderTarget, DbReservation, DbSchedule, DbService, DbUser};

// Mock repositories for testing. String arguments are owned so expectations
// don't need 'static borrows.
mock! {
    pub UserRepo {
        pub async fn create_user(
            &self,
            email: String,
            password_hash: String,
            name: String,
            phone: Option<String>,
            role: String,
        ) -> eyre::Result<DbUser>;

        pub async fn get_user_by_id(&self, id: Uuid) -> eyre::Result<Option<DbUser>>;

        pub async fn get_user_by_email(&self, email: String) -> eyre::Result<Option<DbUser>>;
    }
}

mock! {
    pub ServiceRepo {
        pub async fn get_service_by_id(&self, id: Uuid) -> eyre::Result<Option<DbService>>;

        pub async fn count_active_reservations(&self, service_id: Uuid) -> eyre::Result<i64>;
    }
}

mock! {
    pub ScheduleRepo {
        pub async fn create_schedule(
            &self,
            service_id: Uuid,
            day_of_week: i16,
            start_time: NaiveTime,
            end_time: NaiveTime,
        ) -> eyre::Result<DbSchedule>;

        pub async fn get_active_schedules_for_service(
            &self,
            service_id: Uuid,
        ) -> eyre::Result<Vec<DbSchedule>>;
    }
}

mock! {
    pub ReservationRepo {
        pub async fn get_active_intervals(
            &self,
            service_id: Uuid,
            date: NaiveDate,
            exclude: Option<Uuid>,
        ) -> eyre::Result<Vec<(NaiveTime, NaiveTime)>>;

        pub async fn get_reservation_by_id(&self, id: Uuid) -> eyre::Result<Option<DbReservation>>;

        pub async fn lock_reservation(&self, id: Uuid) -> eyre::Result<Option<DbReservation>>;

        pub async fn reminder_targets(
            &self,
            date: NaiveDate,
            status: String,
        ) -> eyre::Result<Vec<DbReminderTarget>>;
    }
}

mock! {
    pub NotificationRepo {
        pub async fn create_notification(
            &self,
            user_id: Uuid,
            kind: String,
            title: String,
            message: String,
            reservation_id: Option<Uuid>,
        ) -> eyre::Result<DbNotification>;

        pub async fn reminder_exists(
            &self,
            user_id: Uuid,
            reservation_id: Uuid,
            kind: String,
        ) -> eyre::Result<bool>;
    }
}
