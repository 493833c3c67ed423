mod test_lobby_query;
mod test_peer_leaves_others_stay;
mod test_signal_relay;
