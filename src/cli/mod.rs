pub mod actions;
pub mod cleanup;
pub mod render;

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;

/// Parse command line arguments and return ArgMatches.
pub fn parse_args() -> ArgMatches {
    build_command().get_matches()
}

pub fn build_command() -> Command {
    Command::new("nutriscan")
        .about("Scan nutrition labels, look up products and compare them")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .help("Path to a TOML configuration file")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("api-url")
                .long("api-url")
                .global(true)
                .help("Backend base URL, e.g. https://host/api/v1")
                .value_name("URL"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .short('j')
                .global(true)
                .help("Print results as JSON")
                .action(ArgAction::SetTrue),
        )
        .subcommand(
            Command::new("login")
                .about("Log in with email and password")
                .arg(email_arg())
                .arg(password_arg()),
        )
        .subcommand(
            Command::new("register")
                .about("Create an account and log in")
                .arg(
                    Arg::new("name")
                        .long("name")
                        .required(true)
                        .value_name("NAME"),
                )
                .arg(email_arg())
                .arg(password_arg()),
        )
        .subcommand(Command::new("logout").about("Forget the stored session"))
        .subcommand(Command::new("whoami").about("Show the logged-in user"))
        .subcommand(Command::new("oauth-url").about("Print the Google sign-in URL"))
        .subcommand(
            Command::new("profile")
                .about("Show or update the profile")
                .arg(Arg::new("name").long("name").value_name("NAME"))
                .arg(Arg::new("avatar-url").long("avatar-url").value_name("URL")),
        )
        .subcommand(
            Command::new("password")
                .about("Change the account password")
                .arg(Arg::new("current").long("current").value_name("PASSWORD"))
                .arg(Arg::new("new").long("new").value_name("PASSWORD"))
                .arg(Arg::new("confirm").long("confirm").value_name("PASSWORD")),
        )
        .subcommand(
            Command::new("scan")
                .about("Upload a nutrition label photo and wait for the analysis")
                .arg(
                    Arg::new("image")
                        .required(true)
                        .value_name("IMAGE")
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("barcode")
                        .long("barcode")
                        .short('b')
                        .value_name("CODE")
                        .help("Barcode of the product, if known"),
                )
                .arg(
                    Arg::new("no-store")
                        .long("no-store")
                        .help("Ask the backend not to keep the image")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("no-wait")
                        .long("no-wait")
                        .help("Return right after the scan is created")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("history")
                .about("List previous scans")
                .arg(page_arg())
                .arg(limit_arg()),
        )
        .subcommand(
            Command::new("show")
                .about("Show one scan")
                .arg(id_arg("ID"))
                .arg(
                    Arg::new("image-url")
                        .long("image-url")
                        .help("Also fetch the stored image URL")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("delete")
                .about("Delete a scan")
                .arg(id_arg("ID")),
        )
        .subcommand(
            Command::new("correct")
                .about("Propose a corrected nutrient value")
                .arg(id_arg("ID"))
                .arg(Arg::new("field").required(true).value_name("FIELD"))
                .arg(Arg::new("value").required(true).value_name("VALUE")),
        )
        .subcommand(
            Command::new("corrections")
                .about("List corrections proposed for a scan")
                .arg(id_arg("ID")),
        )
        .subcommand(
            Command::new("product")
                .about("Look up a product by barcode")
                .arg(Arg::new("barcode").value_name("BARCODE"))
                .arg(
                    Arg::new("image")
                        .long("image")
                        .value_name("FILE")
                        .help("Read the barcode from a photo")
                        .value_parser(value_parser!(PathBuf))
                        .conflicts_with_all(["barcode", "frames"]),
                )
                .arg(
                    Arg::new("frames")
                        .long("frames")
                        .value_name("DIR")
                        .help("Read the barcode from a directory of camera frames")
                        .value_parser(value_parser!(PathBuf))
                        .conflicts_with("barcode"),
                ),
        )
        .subcommand(
            Command::new("compare")
                .about("Compare the products of two scans")
                .arg(id_arg("SCAN_A"))
                .arg(
                    Arg::new("other")
                        .required(true)
                        .value_name("SCAN_B"),
                ),
        )
        .subcommand(
            Command::new("admin")
                .about("Administrative commands")
                .subcommand_required(true)
                .subcommand(Command::new("stats").about("Usage statistics"))
                .subcommand(
                    Command::new("users")
                        .about("List users")
                        .arg(page_arg())
                        .arg(limit_arg()),
                )
                .subcommand(
                    Command::new("user")
                        .about("Show one user")
                        .arg(id_arg("USER_ID")),
                )
                .subcommand(
                    Command::new("role")
                        .about("Change a user's role")
                        .arg(id_arg("USER_ID"))
                        .arg(
                            Arg::new("role")
                                .required(true)
                                .value_name("ROLE")
                                .value_parser(["user", "admin"]),
                        ),
                )
                .subcommand(
                    Command::new("delete")
                        .about("Delete a user")
                        .arg(id_arg("USER_ID")),
                ),
        )
}

fn email_arg() -> Arg {
    Arg::new("email")
        .long("email")
        .short('e')
        .required(true)
        .value_name("EMAIL")
}

fn password_arg() -> Arg {
    Arg::new("password")
        .long("password")
        .short('p')
        .value_name("PASSWORD")
        .help("Read from stdin when omitted")
}

fn id_arg(name: &'static str) -> Arg {
    Arg::new("id").required(true).value_name(name)
}

fn page_arg() -> Arg {
    Arg::new("page")
        .long("page")
        .value_name("N")
        .default_value("1")
        .value_parser(value_parser!(u32).range(1..))
}

fn limit_arg() -> Arg {
    Arg::new("limit")
        .long("limit")
        .value_name("N")
        .default_value("10")
        .value_parser(value_parser!(u32).range(1..=100))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_definition_is_consistent() {
        build_command().debug_assert();
    }

    #[test]
    fn test_parses_scan_flags() {
        let matches = build_command()
            .try_get_matches_from(["nutriscan", "--json", "scan", "label.jpg", "--no-wait", "-b", "123"])
            .unwrap();
        assert!(matches.get_flag("json"));

        let (name, sub) = matches.subcommand().unwrap();
        assert_eq!(name, "scan");
        assert_eq!(
            sub.get_one::<PathBuf>("image").unwrap(),
            &PathBuf::from("label.jpg")
        );
        assert!(sub.get_flag("no-wait"));
        assert!(!sub.get_flag("no-store"));
        assert_eq!(sub.get_one::<String>("barcode").unwrap(), "123");
    }

    #[test]
    fn test_history_defaults() {
        let matches = build_command()
            .try_get_matches_from(["nutriscan", "history"])
            .unwrap();
        let (_, sub) = matches.subcommand().unwrap();
        assert_eq!(sub.get_one::<u32>("page"), Some(&1));
        assert_eq!(sub.get_one::<u32>("limit"), Some(&10));
    }

    #[test]
    fn test_product_sources_conflict() {
        let result = build_command().try_get_matches_from([
            "nutriscan",
            "product",
            "123",
            "--image",
            "label.jpg",
        ]);
        assert!(result.is_err());
    }
}
