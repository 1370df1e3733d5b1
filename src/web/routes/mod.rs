pub mod notification_routes;
