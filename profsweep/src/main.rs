mod application;

mod presentation {
    pub mod cli;
    pub mod prompt;
}

use profsweep_core::error::Result;

fn main() -> Result<()> {
    application::run()
}
