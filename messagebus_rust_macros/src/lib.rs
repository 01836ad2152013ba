use proc_macro::TokenStream;
use quote::quote;
use syn::{
    bracketed,
    parse::{Parse, ParseStream},
    parse_macro_input,
    punctuated::Punctuated,
    Expr, Ident, LitStr, Token,
};

// ============================================================================
// subscriptions! function-like macro
// ============================================================================

/// Builds a `messagebus_rust::Subscriptions` table from a declaration list.
///
/// Each entry names one destination (a string literal or `&str`
/// expression) or several (a bracketed list), optionally a
/// `priority = <Priority>` and/or an `action = "<action>"` clause, then
/// `=>` and the listener expression.
/// The listener expression is wrapped in an `Arc`, so anything
/// implementing `MessageListener` works: a free function, a closure, or a
/// struct value.
///
/// # Usage
///
/// ```ignore
/// use messagebus_rust::{subscriptions, Priority};
///
/// let table = subscriptions! {
///     "system.shutdown" => on_shutdown,
///     ["lifecycle.start", "lifecycle.stop"] => on_lifecycle,
///     "system.shutdown", priority = Priority::High, action = "finish" => on_finish,
/// };
/// table.bind(&bus)?;
/// ```
///
/// Expansion is purely syntactic: the declarations become
/// `Subscriptions::declare` calls, validated at `bind` time like any
/// hand-built table.
#[proc_macro]
pub fn subscriptions(input: TokenStream) -> TokenStream {
    let table = parse_macro_input!(input as SubscriptionsInput);

    let declarations = table.entries.iter().map(|entry| {
        let destinations = entry.destinations.iter();
        let destinations = destinations.map(|dest| quote! { (#dest).to_string() });
        let priority = match &entry.priority {
            Some(expr) => quote! { #expr },
            None => quote! { messagebus_rust::Priority::Normal },
        };
        let action = match &entry.action {
            Some(lit) => quote! { ::std::option::Option::Some(#lit.to_string()) },
            None => quote! { ::std::option::Option::None },
        };
        let listener = &entry.listener;

        quote! {
            __subscriptions = __subscriptions.declare(
                ::std::vec![#(#destinations),*],
                #priority,
                #action,
                ::std::sync::Arc::new(#listener),
            );
        }
    });

    let expanded = quote! {
        {
            let mut __subscriptions = messagebus_rust::Subscriptions::new();
            #(#declarations)*
            __subscriptions
        }
    };

    TokenStream::from(expanded)
}

struct SubscriptionsInput {
    entries: Vec<SubscriptionEntry>,
}

struct SubscriptionEntry {
    destinations: Vec<Expr>,
    priority: Option<Expr>,
    action: Option<LitStr>,
    listener: Expr,
}

impl Parse for SubscriptionsInput {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let entries: Punctuated<SubscriptionEntry, Token![,]> =
            input.parse_terminated(SubscriptionEntry::parse, Token![,])?;
        Ok(Self {
            entries: entries.into_iter().collect(),
        })
    }
}

impl Parse for SubscriptionEntry {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        // Destinations: one expression or a bracketed list. String
        // literals and &str constants both work.
        let mut destinations = Vec::new();
        if input.peek(syn::token::Bracket) {
            let content;
            bracketed!(content in input);
            let list: Punctuated<Expr, Token![,]> =
                content.parse_terminated(Expr::parse, Token![,])?;
            destinations.extend(list);
            if destinations.is_empty() {
                return Err(input.error("expected at least one destination"));
            }
        } else {
            destinations.push(input.parse()?);
        }

        // Optional clauses: `, priority = <expr>` and `, action = "<lit>"`
        let mut priority = None;
        let mut action = None;
        loop {
            let fork = input.fork();
            if fork.parse::<Token![,]>().is_err() || !fork.peek(Ident) {
                break;
            }
            let ident: Ident = fork.parse()?;
            if ident != "priority" && ident != "action" {
                break;
            }

            input.parse::<Token![,]>()?;
            let keyword: Ident = input.parse()?;
            input.parse::<Token![=]>()?;
            if keyword == "priority" {
                if priority.is_some() {
                    return Err(input.error("duplicate priority clause"));
                }
                priority = Some(input.parse()?);
            } else {
                if action.is_some() {
                    return Err(input.error("duplicate action clause"));
                }
                action = Some(input.parse()?);
            }
        }

        input.parse::<Token![=>]>()?;
        let listener = input.parse()?;

        Ok(Self {
            destinations,
            priority,
            action,
            listener,
        })
    }
}
