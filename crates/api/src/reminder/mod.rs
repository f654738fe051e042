mod list_reminders;
pub mod run_due_reminders;
pub mod schedule_reminders;

use actix_web::web;
use list_reminders::list_reminders_controller;
use run_due_reminders::deliver_reminders_controller;
use schedule_reminders::schedule_reminders_controller;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route(
        "/reminders/schedule",
        web::post().to(schedule_reminders_controller),
    );
    cfg.route(
        "/reminders/deliver",
        web::post().to(deliver_reminders_controller),
    );
    cfg.route("/reminders", web::get().to(list_reminders_controller));
}
