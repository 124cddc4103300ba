mod app;
mod cache;
mod config;
mod error;
mod extract;
mod process;
mod util;
mod wrapper;

fn main() {
    std::process::exit(app::run());
}
