use arbalest::entry;
use arbalest::error::AppResult;

fn main() -> AppResult<()> {
    entry::run()
}
