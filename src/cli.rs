// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{arg, value_parser, ArgAction, Command};

fn json_flags(cmd: Command) -> Command {
    cmd.arg(arg!(--json "Print JSON").action(ArgAction::SetTrue))
        .arg(
            arg!(--jsonl "Print one JSON object per line")
                .action(ArgAction::SetTrue)
                .conflicts_with("json"),
        )
}

fn report_cmd(name: &'static str, about: &'static str) -> Command {
    json_flags(
        Command::new(name)
            .about(about)
            .arg(arg!(--tenant <TENANT> "Tenant name").required(true))
            .arg(arg!(--role <ROLE> "Viewer role, e.g. OWNER or AUDITOR").required(true))
            .arg(arg!(--"as-of" <DATE> "Treat this date (YYYY-MM-DD) as today").required(false)),
    )
}

pub fn build_cli() -> Command {
    Command::new("henledger")
        .about("Poultry farm bookkeeping analytics")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand_required(false)
        .subcommand(Command::new("init").about("Create the database and schema"))
        .subcommand(
            Command::new("tenant")
                .about("Farms and farm groups")
                .subcommand(
                    Command::new("add")
                        .arg(arg!(--name <NAME>).required(true))
                        .arg(arg!(--parent <PARENT> "Parent tenant name").required(false)),
                )
                .subcommand(
                    Command::new("move")
                        .about("Re-parent a tenant; omit --parent to make it a root")
                        .arg(arg!(--name <NAME>).required(true))
                        .arg(arg!(--parent <PARENT>).required(false)),
                )
                .subcommand(json_flags(Command::new("list"))),
        )
        .subcommand(
            Command::new("tx")
                .about("Ledger transactions")
                .subcommand(
                    Command::new("add")
                        .arg(arg!(--tenant <TENANT>).required(true))
                        .arg(arg!(--date <DATE> "YYYY-MM-DD").required(true))
                        .arg(
                            arg!(--"type" <TYPE>)
                                .help("SALE, PURCHASE, PAYMENT, TDS, DISCOUNT, EXPENSE, INCOME")
                                .required(true),
                        )
                        .arg(
                            arg!(--category <CATEGORY>)
                                .help("EGG, FEED, MEDICINE, OTHER, CHICK, GROWER, MANURE, EMPLOYEE")
                                .required(true),
                        )
                        .arg(arg!(--amount <AMOUNT>).required(true))
                        .arg(arg!(--item <ITEM> "Item name").required(false))
                        .arg(arg!(--qty <QTY> "Quantity; kg for feed").required(false))
                        .arg(arg!(--unit <UNIT>).required(false))
                        .arg(arg!(--rate <RATE>).required(false))
                        .arg(arg!(--note <NOTE>).required(false)),
                )
                .subcommand(json_flags(
                    Command::new("list")
                        .arg(arg!(--tenant <TENANT>).required(true))
                        .arg(arg!(--month <YYYY_MM>).required(false))
                        .arg(arg!(--category <CATEGORY> "Effective category").required(false))
                        .arg(
                            arg!(--limit <N>)
                                .required(false)
                                .value_parser(value_parser!(usize)),
                        ),
                )),
        )
        .subcommand(
            Command::new("import")
                .about("Bulk import")
                .subcommand(
                    Command::new("transactions")
                        .about("CSV: date,type,category,item,quantity,unit,rate,amount,notes")
                        .arg(arg!(--tenant <TENANT>).required(true))
                        .arg(arg!(--path <PATH>).required(true)),
                ),
        )
        .subcommand(
            Command::new("report")
                .about("Analytics reports")
                .subcommand(
                    report_cmd("monthly", "One month's figures with derived metrics")
                        .arg(arg!(--month <YYYY_MM>).required(true)),
                )
                .subcommand(report_cmd("yearly", "Per-year totals, newest first"))
                .subcommand(report_cmd("trailing", "Last twelve months, oldest first"))
                .subcommand(
                    report_cmd("breakdown", "Rows of one category for a month, grouped by date")
                        .arg(arg!(--month <YYYY_MM>).required(true))
                        .arg(arg!(--category <CATEGORY> "Category, or PAYMENT").required(true)),
                )
                .subcommand(
                    report_cmd("egg-prices", "Average egg price per item and month, newest first")
                        .arg(arg!(--item <ITEM> "Exact item name").required(false))
                        .arg(arg!(--from <DATE> "First day, YYYY-MM-DD").required(false))
                        .arg(arg!(--to <DATE> "Last day, YYYY-MM-DD").required(false)),
                ),
        )
        .subcommand(
            Command::new("sensitivity")
                .about("Per-tenant sensitive data flags")
                .subcommand(
                    Command::new("set")
                        .arg(arg!(--tenant <TENANT>).required(true))
                        .arg(
                            arg!(--key <KEY> "EGGS_SOLD, FEED_PURCHASED, NET_PROFIT, ...")
                                .required(true),
                        )
                        .arg(arg!(--sensitive <BOOL> "true|false").required(true)),
                )
                .subcommand(
                    Command::new("unset")
                        .about("Remove a tenant's own flag so it inherits again")
                        .arg(arg!(--tenant <TENANT>).required(true))
                        .arg(arg!(--key <KEY>).required(true)),
                )
                .subcommand(json_flags(
                    Command::new("list").arg(arg!(--tenant <TENANT>).required(true)),
                ))
                .subcommand(json_flags(
                    Command::new("check")
                        .arg(arg!(--tenant <TENANT>).required(true))
                        .arg(arg!(--key <KEY>).required(true))
                        .arg(
                            arg!(--role <ROLE> "Also report whether this role sees it")
                                .required(false),
                        ),
                )),
        )
        .subcommand(
            Command::new("role")
                .about("Role permissions per tenant")
                .subcommand(
                    Command::new("set")
                        .arg(arg!(--tenant <TENANT>).required(true))
                        .arg(arg!(--role <ROLE>).required(true))
                        .arg(arg!(--"view-sensitive").action(ArgAction::SetTrue))
                        .arg(arg!(--edit).action(ArgAction::SetTrue))
                        .arg(arg!(--approve).action(ArgAction::SetTrue))
                        .arg(arg!(--"manage-users").action(ArgAction::SetTrue))
                        .arg(arg!(--charts).action(ArgAction::SetTrue)),
                )
                .subcommand(
                    Command::new("seed")
                        .about("Insert the default roles, keeping existing rows")
                        .arg(arg!(--tenant <TENANT>).required(true)),
                )
                .subcommand(json_flags(
                    Command::new("list").arg(arg!(--tenant <TENANT>).required(true)),
                )),
        )
        .subcommand(
            Command::new("ledger")
                .about("Precomputed monthly figures")
                .subcommand(
                    Command::new("set")
                        .arg(arg!(--tenant <TENANT>).required(true))
                        .arg(arg!(--month <YYYY_MM>).required(true))
                        .arg(arg!(--eggs <N>).required(false))
                        .arg(arg!(--feeds <N>).required(false))
                        .arg(arg!(--medicines <N>).required(false))
                        .arg(arg!(--"net-profit" <N>).required(false)),
                )
                .subcommand(
                    Command::new("breakdown").subcommand(
                        Command::new("add")
                            .arg(arg!(--tenant <TENANT>).required(true))
                            .arg(arg!(--month <YYYY_MM>).required(true))
                            .arg(
                                arg!(--"type" <TYPE> "e.g. EGG_LARGE, FEED_LAYER_MASH")
                                    .required(true),
                            )
                            .arg(arg!(--qty <QTY>).required(true))
                            .arg(arg!(--amount <AMOUNT>).required(false)),
                    ),
                ),
        )
        .subcommand(
            Command::new("keywords")
                .about("Item keywords that mark FEED rows as medicine")
                .subcommand(json_flags(Command::new("list")))
                .subcommand(
                    Command::new("set").arg(
                        arg!(--keywords <LIST> "Comma-separated keywords").required(true),
                    ),
                )
                .subcommand(Command::new("reset").about("Restore the built-in list")),
        )
        .subcommand(
            Command::new("doctor")
                .about("Audit misfiled medicine rows and tenant cycles")
                .arg(arg!(--tenant <TENANT>).required(false)),
        )
}
