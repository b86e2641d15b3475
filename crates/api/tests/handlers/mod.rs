mod availability_test;
mod jobs_test;
mod middleware_test;
mod reservation_test;
mod routes_test;
mod schedule_test;
