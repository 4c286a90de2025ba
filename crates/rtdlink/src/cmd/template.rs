use rtdlink_template::load_itf;

use crate::cmd::TemplateArgs;
use crate::exit::{template_error, CliResult, SUCCESS};
use crate::output::{print_template, OutputFormat};

pub fn run(args: TemplateArgs, format: OutputFormat) -> CliResult<i32> {
    let template =
        load_itf(&args.itf).map_err(|err| template_error("template load failed", err))?;
    print_template(&template, format);
    Ok(SUCCESS)
}
