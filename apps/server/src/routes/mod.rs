mod api;
mod health;
mod ws;

macros_utils::routes! {
    module health,
    module api,
    module ws,
}

#[cfg(test)]
mod tests;
