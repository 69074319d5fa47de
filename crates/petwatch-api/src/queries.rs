// GraphQL documents sent to the collar service.

/// Every pet across every household of the logged-in user, with the
/// collar's operating parameters and last connection state.
pub(crate) const CURRENT_USER_PETS: &str = r"
query {
  currentUser {
    __typename
    id
    userHouseholds {
      __typename
      household {
        __typename
        pets {
          __typename
          id
          name
          breed { __typename id name }
          device {
            __typename
            id
            moduleId
            info
            operationParams { __typename mode ledEnabled ledOffAt }
            lastConnectionState {
              __typename
              date
              ... on ConnectedToUser { user { __typename id firstName lastName } }
              ... on ConnectedToBase { chargingBase { __typename id } }
              ... on ConnectedToCellular { signalStrengthPercent }
            }
          }
        }
      }
    }
  }
}";

/// The ongoing activity (rest or walk) of one pet.
pub(crate) const PET_LOCATION: &str = r"
query PetLocation($petId: String!) {
  pet(id: $petId) {
    ongoingActivity {
      __typename
      start
      areaName
      ... on OngoingWalk {
        positions { __typename date position { __typename latitude longitude } }
      }
      ... on OngoingRest {
        position { __typename latitude longitude }
        place { __typename id name address }
      }
    }
  }
}";

/// Shared by the LED and lost-mode writes; only the input differs.
pub(crate) const UPDATE_OPERATION_PARAMS: &str = r"
mutation UpdateDeviceOperationParams($input: UpdateDeviceOperationParamsInput!) {
  updateDeviceOperationParams(input: $input) {
    __typename
    id
    moduleId
    operationParams { __typename mode ledEnabled ledOffAt }
  }
}";
