mod helpers;
mod mocks;
mod transfers;
mod webhooks;
