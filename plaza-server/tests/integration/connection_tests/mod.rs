mod test_auth_failure_closes;
mod test_message_before_join_ignored;
mod test_single_peer_joins_room;
