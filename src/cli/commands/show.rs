//! Show command - fetch and display the cart

use super::common;
use crate::cli::args::ShowArgs;
use crate::config::Config;
use crate::error::CartResult;
use crate::ui::UiContext;

/// Execute the show command
pub async fn execute(args: ShowArgs, config: &Config) -> CartResult<()> {
    let machine_readable = args.format.is_machine_readable();
    let ctx = UiContext::for_output(machine_readable);

    let sync = common::connect(config, &ctx, !machine_readable).await?;
    common::render(&ctx, &sync.view(), args.format)
}
